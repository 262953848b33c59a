use clap::{Parser, Subcommand};
use illustra::capture::{Capture, CaptureError, CaptureOutcome, CaptureSaveChain};
use illustra::config::{self, IllustraConfig};
use illustra::existence::{ExistenceCache, HttpProber, Prober};
use illustra::naming::Segment;
use illustra::output;
use illustra::pipeline::{PipelineEvent, RenderPipeline};
use illustra::request::RequestDescriptor;
use illustra::resolve::{CategoryResolver, StaticBaseUrl};
use illustra::sink::BitmapSink;
use illustra::store::DiskStore;
use illustra::transform::Transform;
use illustra::types::{DeviceRef, Hint, ImageCategory, ProductRef, ResourceId, StepRef, TargetId};
use illustra::wallpaper::WallpaperAssignments;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::mpsc::{self, Sender};

/// Identifies the image being asked for. Which flags apply depends on the
/// category; the first matching shape wins, in the order listed.
#[derive(clap::Args, Clone, Default)]
struct HintArgs {
    /// Local image file (any category)
    #[arg(long)]
    file: Option<PathBuf>,
    /// Opaque content handle (any category)
    #[arg(long)]
    content: Option<String>,
    /// Embedded resource id (drawable)
    #[arg(long)]
    resource: Option<u32>,
    /// Raw category value (device-category, scene-category)
    #[arg(long)]
    raw: Option<u32>,
    /// Device id (device-large, device-small, device-background, product, device-type)
    #[arg(long)]
    device: Option<String>,
    /// Person id, used with --place (person, person-large, person-background)
    #[arg(long)]
    person: Option<String>,
    /// Pet smart key (pet-small, pet-large)
    #[arg(long)]
    smart_key: Option<String>,
    /// Scene id, used with --action (scene-action)
    #[arg(long)]
    scene: Option<String>,
    /// Action id, used with --scene (scene-action)
    #[arg(long)]
    action: Option<String>,
    /// Brand name (brand)
    #[arg(long)]
    brand: Option<String>,
    /// Walkthrough step, used with --product (pairing-step, reconnect-step)
    #[arg(long)]
    step: Option<u32>,
    /// Product id
    #[arg(long)]
    product: Option<String>,
    /// Remembered device-type tag of a product record
    #[arg(long)]
    screen_tag: Option<String>,
    /// Device-type tag
    #[arg(long)]
    device_type: Option<String>,
    /// Place id
    #[arg(long)]
    place: Option<String>,
}

impl HintArgs {
    fn to_hint(&self) -> Result<Hint, String> {
        let a = self.clone();
        let hint = if let Some(path) = a.file {
            Hint::File(path)
        } else if let Some(handle) = a.content {
            Hint::Content(handle)
        } else if let Some(id) = a.resource {
            Hint::Resource(id)
        } else if let Some(raw) = a.raw {
            Hint::Raw(raw)
        } else if let Some(device_id) = a.device {
            Hint::Device(DeviceRef {
                device_id,
                place_id: a.place,
                product_id: a.product,
                device_type: a.device_type,
            })
        } else if let (Some(person), Some(place)) = (a.person, a.place.clone()) {
            Hint::Pair(person, place)
        } else if let Some(key) = a.smart_key {
            Hint::SmartKey(key)
        } else if let (Some(scene), Some(action)) = (a.scene, a.action) {
            Hint::Action { scene, action }
        } else if let Some(name) = a.brand {
            Hint::Brand(name)
        } else if let (Some(step), Some(product_id)) = (a.step, a.product.clone()) {
            Hint::Step(StepRef { product_id, step })
        } else if let Some(id) = a.product {
            match a.screen_tag {
                Some(tag) => Hint::Product(ProductRef {
                    id,
                    screen_tag: Some(tag),
                }),
                None => Hint::ProductId(id),
            }
        } else if let Some(tag) = a.device_type {
            Hint::DeviceType(tag)
        } else if let Some(place) = a.place {
            Hint::Place(place)
        } else {
            return Err("no hint given; see --help for the hint flags".into());
        };
        Ok(hint)
    }
}

/// Request options shared by `render` and `capture`.
#[derive(clap::Args, Clone)]
struct RequestArgs {
    /// Target the image is rendered into
    #[arg(long, default_value = "main")]
    target: String,
    /// Transform applied to every result (repeatable): blur:2.5, overlay:000000b0,
    /// rotate:90, crop:120x80, square
    #[arg(long = "transform")]
    transforms: Vec<Transform>,
    /// Transform applied only to stock images (repeatable)
    #[arg(long = "stock-transform")]
    stock_transforms: Vec<Transform>,
    /// Transform applied only to user photos (repeatable)
    #[arg(long = "user-transform")]
    user_transforms: Vec<Transform>,
    /// Resource shown when no image is found
    #[arg(long)]
    placeholder: Option<u32>,
    /// Resource shown when no image is found, preferred over --placeholder
    #[arg(long)]
    error_image: Option<u32>,
    /// Never use user photos
    #[arg(long)]
    suppress_ugc: bool,
    /// Save the rendered bitmap (local files only)
    #[arg(long)]
    out: Option<PathBuf>,
}

impl RequestArgs {
    fn descriptor(&self, category: ImageCategory, hint: Hint) -> RequestDescriptor {
        let mut builder = RequestDescriptor::builder(category, hint, self.target.as_str())
            .transforms(self.transforms.iter().copied())
            .suppress_user_generated(self.suppress_ugc);
        for t in &self.stock_transforms {
            builder = builder.stock_transform(*t);
        }
        for t in &self.user_transforms {
            builder = builder.user_transform(*t);
        }
        if let Some(id) = self.placeholder {
            builder = builder.placeholder(ResourceId(id));
        }
        if let Some(id) = self.error_image {
            builder = builder.error_fallback(ResourceId(id));
        }
        builder.build()
    }
}

#[derive(Parser)]
#[command(name = "illustra")]
#[command(about = "Resolve and deliver category-driven device, place and people images")]
#[command(long_about = "\
Resolve and deliver category-driven device, place and people images

Every image request names a category and a hint. Each category has a fixed
chain of candidates, tried in order until one is found:

  device-large/small   user photo → product image (if the server has it) → device type image
  product              product image (if the server has it) → device type image
  device-background    user photo → product image → place image
  place                user photo → default wallpaper (one of six, sticky per place)
  person/person-large  user photo → generic avatar
  person-background    person's user photo → place image
  pet-small/large      user photo → stock pet image
  device-type, pairing-step, reconnect-step, brand, scene-action   remote image
  device-category, scene-category, drawable                         embedded image

Remote images live at {base_url}/o/{segment}/{id}[/{sub_id}]/{variant}-and-{density}.png.

Run 'illustra gen-config' to generate a documented illustra.toml.")]
#[command(version)]
struct Cli {
    /// Config file
    #[arg(long, default_value = "illustra.toml", global = true)]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Resolve a request and print the chosen location
    Resolve {
        category: ImageCategory,
        #[command(flatten)]
        hint: HintArgs,
        /// Never use user photos
        #[arg(long)]
        suppress_ugc: bool,
    },
    /// Check whether the asset server has an image at a URL
    Probe { url: String },
    /// Print a remote image URL without checking it
    Url {
        /// dtypes, products, brands, pair, reconnect or actions
        segment: Segment,
        id: String,
        /// e.g. product_large, pair3_large
        variant: String,
        #[arg(long)]
        sub_id: Option<String>,
    },
    /// Run one request through the full pipeline and render it
    Render {
        category: ImageCategory,
        #[command(flatten)]
        hint: HintArgs,
        #[command(flatten)]
        request: RequestArgs,
    },
    /// Save an image file as a user photo and re-render its target
    Capture {
        category: ImageCategory,
        /// Image file standing in for the camera or picker
        #[arg(long)]
        from: PathBuf,
        #[command(flatten)]
        hint: HintArgs,
        #[command(flatten)]
        request: RequestArgs,
    },
    /// Print a stock illustra.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let load_config = || config::load_config(&cli.config);

    match cli.command {
        Command::Resolve {
            category,
            hint,
            suppress_ugc,
        } => {
            let config = load_config()?;
            let resolver = build_resolver(&config, None);
            let location = resolver.resolve(category, &hint.to_hint()?, suppress_ugc)?;
            output::print_resolution(location.as_ref());
        }
        Command::Probe { url } => {
            let config = load_config()?;
            let prober = HttpProber::new(config.remote.probe_timeout());
            match prober.probe(&url) {
                Ok(exists) => println!("{}", if exists { "exists" } else { "missing" }),
                Err(e) => println!("missing ({e})"),
            }
        }
        Command::Url {
            segment,
            id,
            variant,
            sub_id,
        } => {
            let config = load_config()?;
            let resolver = build_resolver(&config, None);
            println!("{}", resolver.remote_url(segment, &id, sub_id.as_deref(), &variant)?);
        }
        Command::Render {
            category,
            hint,
            request,
        } => {
            let config = load_config()?;
            let descriptor = request.descriptor(category, hint.to_hint()?);
            let (tx, printer) = spawn_printer();
            let resolver = build_resolver(&config, Some(tx.clone()));
            let (pipeline, render_loop) =
                RenderPipeline::new(resolver, config::effective_workers(&config.workers), Some(tx))?;

            pipeline.submit(descriptor);
            drop(pipeline);

            let mut sink = BitmapSink::new();
            let summary = render_loop.run(&mut sink);
            printer.join().map_err(|_| "event printer panicked")?;
            output::print_render_summary(&summary);
            save_output(&sink, &request)?;
        }
        Command::Capture {
            category,
            from,
            hint,
            request,
        } => {
            let config = load_config()?;
            let descriptor = request.descriptor(category, hint.to_hint()?);
            let (tx, printer) = spawn_printer();
            let resolver = build_resolver(&config, Some(tx.clone()));
            let (pipeline, render_loop) =
                RenderPipeline::new(resolver, config::effective_workers(&config.workers), Some(tx))?;

            let store = Arc::new(DiskStore::new(config.store.dir_path()));
            let chain = CaptureSaveChain::new(store, descriptor);
            let mut source = move || -> Result<Capture, CaptureError> {
                image::open(&from)
                    .map(Capture::Photo)
                    .map_err(|e| CaptureError::Acquire(format!("{}: {e}", from.display())))
            };
            let outcome = chain.execute(&pipeline, &mut source);
            drop(pipeline);

            let mut sink = BitmapSink::new();
            let summary = render_loop.run(&mut sink);
            printer.join().map_err(|_| "event printer panicked")?;
            output::print_render_summary(&summary);
            if let CaptureOutcome::Failed(e) = outcome {
                return Err(e.into());
            }
            save_output(&sink, &request)?;
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

/// Wire a resolver from config: HTTP probes, the on-disk photo store and the
/// persisted wallpaper map.
fn build_resolver(config: &IllustraConfig, events: Option<Sender<PipelineEvent>>) -> CategoryResolver {
    let prober = Arc::new(HttpProber::new(config.remote.probe_timeout()));
    let mut cache = ExistenceCache::new(prober);
    let mut wallpapers = WallpaperAssignments::load(&config.store.wallpaper_path());
    if let Some(tx) = events {
        cache = cache.with_events(tx.clone());
        wallpapers = wallpapers.with_events(tx);
    }
    CategoryResolver::new(
        Arc::new(DiskStore::new(config.store.dir_path())),
        Arc::new(cache),
        Arc::new(StaticBaseUrl(config.remote.base_url.clone())),
        Arc::new(wallpapers),
        config.remote.density.as_str(),
    )
}

/// Print pipeline events from a dedicated thread until every sender is gone.
fn spawn_printer() -> (Sender<PipelineEvent>, std::thread::JoinHandle<()>) {
    let (tx, rx) = mpsc::channel();
    let printer = std::thread::spawn(move || {
        for event in rx {
            output::print_pipeline_event(&event);
        }
    });
    (tx, printer)
}

fn save_output(sink: &BitmapSink, request: &RequestArgs) -> Result<(), Box<dyn std::error::Error>> {
    let Some(out) = &request.out else {
        return Ok(());
    };
    let target = TargetId::from(request.target.as_str());
    match sink.bitmap(&target) {
        Some(bitmap) => {
            bitmap.save(out)?;
            println!("Saved {}", out.display());
        }
        None => println!("Nothing saved: {target} did not render a local image"),
    }
    Ok(())
}

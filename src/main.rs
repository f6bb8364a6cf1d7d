use cardpress::deck::{DeckStats, load_deck, save_deck, sort_deck, write_csv};
use cardpress::pipeline::{self, Outputs};
use cardpress::text::load_font;
use cardpress::{config, output, transport_deck};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

fn version_string() -> &'static str {
    let on_tag = env!("ON_RELEASE_TAG");
    if on_tag == "true" {
        env!("CARGO_PKG_VERSION")
    } else {
        let hash = env!("GIT_HASH");
        if hash.is_empty() {
            "dev@unknown"
        } else {
            // Leaked once at startup
            Box::leak(format!("dev@{hash}").into_boxed_str())
        }
    }
}

#[derive(Parser)]
#[command(name = "cardpress")]
#[command(about = "Print-ready layouts for a deck of travel cards")]
#[command(long_about = "\
Print-ready layouts for a deck of travel cards

The deck is a JSON list of card records. Every field is optional:

  [
    {
      \"image\": \"kyoto.jpg\",          # landscapes/kyoto.jpg, also names the card PNG
      \"flag\": \"jp.png\",              # flags/jp.png
      \"continent\": \"asia\",           # continents/asia_outline.png
      \"transport\": [\"bus\", \"train\"], # transport_icons/bus.png, train.png
      \"city\": \"Kyoto\",               # default \"City\"
      \"country\": \"Japan\",            # default \"Country\"
      \"corner_number\": 7,            # default 1
      \"corner_font_size\": 16         # default 16
    }
  ]

Asset names are resolved under the input root (config [paths] input):

  input/
  ├── landscapes/
  ├── flags/
  ├── continents/
  ├── transport_icons/
  └── Gagalin Regular.ttf          # optional label font

Missing assets are reported per card and left blank; they never stop a run.

'cardpress transport-cards' prints a separate deck of icon cards from
transport_icons/ (counts per icon in config [transport_deck]).

Run 'cardpress gen-config' to generate a documented config.toml.")]
#[command(version = version_string())]
struct Cli {
    /// Deck file
    #[arg(long, default_value = "cards.json", global = true)]
    deck: PathBuf,

    /// Config file (stock defaults when absent)
    #[arg(long, default_value = "config.toml", global = true)]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Render the paged document and one PNG per card
    Build,
    /// Render the paged document only
    Pdf,
    /// Render one PNG per card only
    Cards,
    /// Resolve every asset the deck refers to without rendering
    Check,
    /// Count cards by continent and transport combination
    Stats {
        /// Also export the deck as CSV here (transport lists joined with ';')
        #[arg(long)]
        csv: Option<PathBuf>,
    },
    /// Render the separate deck of transport-icon cards
    TransportCards,
    /// Reorder the deck by continent, then transport combination
    Sort {
        /// Write the sorted deck here instead of overwriting the input
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Print a stock config.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Command::Build => render(&cli.deck, &cli.config, Outputs::ALL)?,
        Command::Pdf => render(
            &cli.deck,
            &cli.config,
            Outputs {
                document: true,
                card_images: false,
            },
        )?,
        Command::Cards => render(
            &cli.deck,
            &cli.config,
            Outputs {
                document: false,
                card_images: true,
            },
        )?,
        Command::Check => {
            let press_config = config::load_config(&cli.config)?;
            let deck = load_deck(&cli.deck)?;
            println!(
                "==> Checking {} against {}",
                cli.deck.display(),
                press_config.paths.input.display()
            );
            let font = load_font(press_config.paths.font.as_deref(), &press_config.paths.input);
            if let Some(reason) = &font.fallback {
                println!("Warning: {reason}; using the built-in font");
            }
            let issues = pipeline::check_assets(&press_config, &deck);
            output::print_check(&issues, deck.len());
        }
        Command::Stats { csv } => {
            let deck = load_deck(&cli.deck)?;
            if let Some(target) = csv {
                write_csv(&target, &deck)?;
                println!("Exported {} cards → {}", deck.len(), target.display());
            }
            output::print_stats(&DeckStats::collect(&deck));
        }
        Command::TransportCards => {
            let press_config = config::load_config(&cli.config)?;
            println!(
                "==> Rendering transport cards from {}",
                press_config.paths.input.join("transport_icons").display()
            );
            let (tx, rx) = std::sync::mpsc::channel();
            let printer = spawn_printer(rx);
            let result = transport_deck::render_transport_deck(&press_config, Some(tx));
            printer.join().ok();
            println!("==> Done: {}", result?);
        }
        Command::Sort { output: target } => {
            let mut deck = load_deck(&cli.deck)?;
            sort_deck(&mut deck);
            let target = target.unwrap_or_else(|| cli.deck.clone());
            save_deck(&target, &deck)?;
            println!("Sorted {} cards → {}", deck.len(), target.display());
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

fn render(
    deck_path: &std::path::Path,
    config_path: &std::path::Path,
    outputs: Outputs,
) -> Result<(), Box<dyn std::error::Error>> {
    let press_config = config::load_config(config_path)?;
    let deck = load_deck(deck_path)?;
    init_thread_pool(&press_config.processing);

    println!("==> Rendering {} cards from {}", deck.len(), deck_path.display());
    let (tx, rx) = std::sync::mpsc::channel();
    let printer = spawn_printer(rx);
    let result = pipeline::build(&press_config, &deck, outputs, Some(tx));
    // The sender is dropped inside build, which ends the printer loop.
    printer.join().ok();
    let summary = result?;
    println!("==> Done: {summary}");
    Ok(())
}

/// Print render events as they arrive; ends when every sender is gone.
fn spawn_printer(
    rx: std::sync::mpsc::Receiver<pipeline::RenderEvent>,
) -> std::thread::JoinHandle<()> {
    std::thread::spawn(move || {
        for event in rx {
            for line in output::format_render_event(&event) {
                println!("{}", line);
            }
        }
    })
}

/// Initialize the rayon thread pool based on processing config.
///
/// Capped at the number of available cores; the config can only lower it.
fn init_thread_pool(processing: &config::ProcessingConfig) {
    let threads = config::effective_threads(processing);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}

use crate::prelude::*;
use clap::Parser;

mod analyze;
mod error;
mod input;
mod layout;
mod llm;
mod prelude;

#[derive(Debug, clap::Parser)]
#[command(
    author,
    version,
    about,
    long_about = "Recover paragraphs, running headers and footers, and section structure from lines extracted out of a PDF"
)]
pub struct App {
    #[command(subcommand)]
    pub command: SubCommands,

    #[clap(flatten)]
    global: Global,
}

#[derive(Debug, Clone, clap::Args)]
pub struct Global {
    /// Analysis configuration file (TOML)
    #[clap(long, env = "PAGEWISE_CONFIG", global = true)]
    config: Option<std::path::PathBuf>,

    /// Whether to display additional information.
    #[clap(long, env = "PAGEWISE_VERBOSE", global = true, default_value = "false")]
    verbose: bool,
}

#[derive(Debug, clap::Parser)]
pub enum SubCommands {
    /// Print the spacing rules derived for each font size
    Rules(crate::layout::RulesOptions),

    /// Print the blocks formed on every page as JSON
    Blocks(crate::layout::LayoutOptions),

    /// Print the header/footer boundary report as JSON
    Boundaries(crate::layout::LayoutOptions),

    /// Run the analysis workflow against a language model
    Analyze(crate::analyze::AnalyzeOptions),
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    color_eyre::install()?;

    let app = App::parse();

    match app.command {
        SubCommands::Rules(options) => crate::layout::rules(options, app.global).await,
        SubCommands::Blocks(options) => crate::layout::blocks(options, app.global).await,
        SubCommands::Boundaries(options) => crate::layout::boundaries(options, app.global).await,
        SubCommands::Analyze(options) => crate::analyze::run(options, app.global).await,
    }
    .map_err(|err: color_eyre::eyre::Report| eyre!(err))
}

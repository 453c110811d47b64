use clap::Parser;
use miette::Result;
use taxonopy::cli::commands::{completions, db, schema};
use taxonopy::cli::{logging, Cli, Commands};

fn main() -> Result<()> {
    // Reset SIGPIPE so piping into `head` and friends exits quietly
    #[cfg(unix)]
    {
        unsafe {
            libc::signal(libc::SIGPIPE, libc::SIG_DFL);
        }
    }
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(2)
                .tab_width(4)
                .build(),
        )
    }))?;

    let cli = Cli::parse();
    let global = cli.global;
    logging::init_tracing(global.verbose, global.quiet);

    match cli.command {
        Commands::Schema(cmd) => schema::run(cmd, &global),
        Commands::Db(cmd) => db::run(cmd, &global),
        Commands::Completions(args) => completions::run(args),
    }
}

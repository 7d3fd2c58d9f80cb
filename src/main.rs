use std::io::{self, Write};
use std::path::PathBuf;
use std::process;

use clap::Parser;

use wsfmt::error::WsError;
use wsfmt::formatter;
use wsfmt::input;
use wsfmt::lexer::Lexer;
use wsfmt::token::Token;

#[derive(Parser)]
#[command(author, version, about = "WS source formatter")]
struct Cli {
    /// Path to the source file
    file: PathBuf,
    /// Dump the token stream as JSON instead of formatting
    #[arg(long)]
    tokens: bool,
}

fn main() {
    let cli = Cli::parse();
    if let Err(err) = run(&cli) {
        let _ = io::stdout().flush();
        eprint!("{err}");
        process::exit(1);
    }
}

fn run(cli: &Cli) -> Result<(), WsError> {
    let name = cli.file.display().to_string();
    let source = input::read_source(&cli.file)?;

    if cli.tokens {
        let tokens: Vec<Token> = Lexer::new(&name, &source).collect();
        let json = serde_json::to_string_pretty(&tokens).map_err(WsError::Json)?;
        println!("{json}");
        return Ok(());
    }

    let output = formatter::format_source(&name, &source).map_err(WsError::Format)?;
    print!("{output}");
    if !output.ends_with('\n') {
        println!();
    }
    Ok(())
}

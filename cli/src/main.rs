// Interactive shell over a FAT32 disk image.

mod tokenizer;

use clap::Parser;
use fatshell_core::FatshellError;
use fatshell_fat32::{Session, Volume};
use log::debug;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "fatshell")]
#[command(about = "Interactive shell for FAT32 disk images", long_about = None)]
struct Cli {
    /// Path to the FAT32 disk image
    image: PathBuf,
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    let volume = match Volume::mount(&cli.image) {
        Ok(volume) => volume,
        Err(FatshellError::Io(e)) => {
            debug!("open failed: {}", e);
            println!("Error: Unrecognized file name");
            return ExitCode::FAILURE;
        }
        Err(e) => {
            debug!("mount failed: {}", e);
            println!("Invalid image");
            return ExitCode::FAILURE;
        }
    };
    let mut session = Session::new(volume);

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        print!("Enter command or exit : {} > ", session.location());
        io::stdout().flush().ok();

        let line = match lines.next() {
            Some(Ok(line)) => line,
            _ => break,
        };
        if line.trim() == "exit" {
            break;
        }

        let tokens = match tokenizer::tokenize(&line) {
            Ok(tokens) => tokens,
            Err(tokenizer::TokenizeError::UnclosedQuote) => {
                println!("Error: Unclosed Quote");
                continue;
            }
        };
        let Some((name, args)) = tokens.split_first() else {
            continue;
        };

        let mut stdout = io::stdout();
        match session.dispatch(name, args, &mut stdout) {
            Ok(()) => {}
            Err(FatshellError::UnknownCommand(_)) => println!("Invalid command"),
            Err(e) => println!("{}", e),
        }
    }

    ExitCode::SUCCESS
}

use std::env;
use std::path::PathBuf;
use std::process;

use cellfeed::{export_feed, ExportOptions, LineEnding};

fn main() {
    env_logger::init();

    // converts first argument into a tsv (same name, silently overrides
    // if the file already exists)
    let file = env::args()
        .nth(1)
        .expect("Please provide a cell feed file to convert");
    let crlf = env::args().nth(2).is_some_and(|a| a == "--crlf");

    let sce = PathBuf::from(file);
    let mut dest = sce.clone();
    while matches!(
        dest.extension().and_then(|e| e.to_str()),
        Some("gz") | Some("zip") | Some("xml")
    ) {
        dest.set_extension("");
    }
    dest.set_extension("tsv");
    if dest == sce {
        eprintln!("{} would be overwritten by its own tsv", sce.display());
        process::exit(1);
    }

    let mut options = ExportOptions::new();
    if crlf {
        options = options.with_line_ending(LineEnding::CrLf);
    }

    match export_feed(&sce, &dest, &options) {
        Ok(summary) => println!(
            "{}: {} rows x {} columns ({} cells)",
            dest.display(),
            summary.rows,
            summary.columns,
            summary.cells
        ),
        Err(e) => {
            eprintln!("cannot convert {}: {e}", sce.display());
            process::exit(1);
        }
    }
}

use std::path::PathBuf;
use std::slice::Iter;

use anyhow::{bail, Context, Result};
use postboard::RunOptions;

const HELP: &str = "Postboard - Render a spreadsheet-backed media feed.

  --url <url>          CSV feed to fetch (overrides feed.url)
  --input <path>       Read the feed from a local CSV file instead
  --output, -o <path>  Where to write the rendered page
  --filter <tag>       Initial tag filter (default: all)
  --config, -c <path>  Config file (default: ~/.config/postboard/config.yaml)
  --once               Fetch once, print the page to stdout and exit
  --open               Open the written page in a browser
  --save-url <url>     Store the feed url in the config file and exit
  --version, -V        Show version and exit
  --help,    -h        Show this help message

While running, type a tag and press Enter to filter, `all` to clear,
Enter alone to refresh now, `q` to quit.";

fn main() {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let opts = match parse_args(&args) {
        Ok(Some(opts)) => opts,
        Ok(None) => return,
        Err(err) => {
            eprintln!("error: {err:?}");
            std::process::exit(2);
        }
    };

    postboard::logging::init();

    if let Err(err) = postboard::run(opts) {
        eprintln!("error: {err:?}");
        std::process::exit(1);
    }
}

fn parse_args(args: &[String]) -> Result<Option<RunOptions>> {
    let mut opts = RunOptions::default();
    let mut save_url: Option<String> = None;
    let mut iter = args.iter();

    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--version" | "-V" => {
                println!("Postboard {}", postboard::VERSION);
                return Ok(None);
            }
            "--help" | "-h" => {
                println!("{HELP}");
                return Ok(None);
            }
            "--once" => opts.once = true,
            "--open" => opts.open = true,
            "--url" => opts.url = Some(flag_value(&mut iter, arg)?),
            "--input" => opts.input = Some(PathBuf::from(flag_value(&mut iter, arg)?)),
            "--output" | "-o" => opts.output = Some(PathBuf::from(flag_value(&mut iter, arg)?)),
            "--filter" => opts.filter = Some(flag_value(&mut iter, arg)?),
            "--config" | "-c" => {
                opts.config_file = Some(PathBuf::from(flag_value(&mut iter, arg)?))
            }
            "--save-url" => save_url = Some(flag_value(&mut iter, arg)?),
            other => bail!("unknown argument {other:?}; see --help"),
        }
    }

    if let Some(url) = save_url {
        let path = postboard::config::save_feed_url(opts.config_file.clone(), &url)
            .context("save feed url")?;
        println!("Saved feed url to {}", path.display());
        return Ok(None);
    }

    Ok(Some(opts))
}

fn flag_value(iter: &mut Iter<'_, String>, flag: &str) -> Result<String> {
    iter.next()
        .cloned()
        .with_context(|| format!("{flag} requires a value"))
}

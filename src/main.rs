use log::debug;
use pokescript::cli::{parse_args, print_usage, resolve_config};
use pokescript::script::{read_script, render_script};
use std::env;
use std::fs::File;
use std::io::Read;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let args: Vec<String> = env::args().collect();
    let program = args.first().map(String::as_str).unwrap_or("pokescript");

    let cli = match parse_args(args.get(1..).unwrap_or(&[])) {
        Ok(cli) => cli,
        Err(e) => {
            eprintln!("{}", e);
            print_usage(program);
            std::process::exit(1);
        }
    };
    if cli.help {
        print_usage(program);
        return Ok(());
    }
    let filename = match &cli.filename {
        Some(filename) => filename.clone(),
        None => {
            print_usage(program);
            std::process::exit(1);
        }
    };

    let config = resolve_config(&cli, atty::is(atty::Stream::Stdout))?;
    debug!("Listing options: {:?}", config);

    let mut file = match File::open(&filename) {
        Ok(file) => file,
        Err(e) => {
            eprintln!("Couldn't open '{}' for reading: {}", filename, e);
            std::process::exit(2);
        }
    };
    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes)?;
    debug!("Loaded {} bytes from {}", bytes.len(), filename);

    let script = read_script(&bytes, &config.reader)?;
    for line in render_script(&script, &config.render)? {
        println!("{}", line);
    }

    Ok(())
}

#[macro_use]
extern crate clap;

use {
    anyhow::Result,
    log::{error, info},
    simplelog::{Config as LogConfig, LevelFilter, TermLogger, TerminalMode},
    std::fs::File,
    std::io::Write,
    sw_sphere::{model, parameters::Parameters},
};

#[quit::main]
fn main() {
    let matches = clap_app!(sw_sphere =>
        (version: crate_version!())
        (about: "Semi-implicit semi-Lagrangian shallow-water model on the rotating sphere")
        (@arg IC: +required "Initial condition id (1, 2, 5, 6, 7, 8, 9 or 105)")
        (@arg DUMP_REF: +required "Cubed-sphere reference output is enabled if > 0")
        (@arg PARAMETERS: -p --parameters +takes_value "Path to a YAML parameters file")
    )
    .get_matches();

    TermLogger::init(
        LevelFilter::Info,
        LogConfig::default(),
        TerminalMode::Mixed,
    )
    .expect("Failed to initialize logger");

    let ic = matches
        .value_of("IC")
        .expect("IC argument is required")
        .parse::<u32>()
        .unwrap_or_else(|e| {
            error!("IC must be an integer: \"{}\"", e);
            quit::with_code(2);
        });
    let dump_ref = matches
        .value_of("DUMP_REF")
        .expect("DUMP_REF argument is required")
        .parse::<i64>()
        .unwrap_or_else(|e| {
            error!("DUMP_REF must be an integer: \"{}\"", e);
            quit::with_code(2);
        });

    let params = match matches.value_of("PARAMETERS") {
        Some(path) => {
            let file = File::open(path).unwrap_or_else(|e| {
                error!("Failed to open {}: \"{}\"", path, e);
                quit::with_code(1);
            });
            let params = serde_yaml::from_reader::<_, Parameters>(file).unwrap_or_else(|e| {
                error!("Failed to parse parameters from {}: \"{}\"", path, e);
                quit::with_code(1);
            });
            info!("Loaded simulation parameters from \"{}\"", path);
            params
        }
        None => Parameters::default(),
    };

    run(&params, ic, dump_ref > 0).unwrap_or_else(|e| {
        error!("Error: \"{}\"", e);
        quit::with_code(1);
    });
}

fn run(params: &Parameters, ic: u32, dump_ref: bool) -> Result<()> {
    info!("Starting ic = {}", ic);

    let output = model::run(params, ic, dump_ref)?;

    let monitor_path = params.environment.output_directory.join(format!(
        "TC{}_monitor.asc",
        ic
    ));
    let mut f = File::create(&monitor_path)?;
    f.write_all(output.monitor.as_bytes())?;

    if let Some(t) = output.instability_at {
        info!("Run stopped by the instability detector at t = {:.0} s", t);
    }
    info!("Finished ic = {}", ic);

    Ok(())
}

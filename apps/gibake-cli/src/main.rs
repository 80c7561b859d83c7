//! gibake: offline global illumination baker
//!
//! Bakes irradiance and ambient occlusion lightmaps and reflection probes for
//! a glTF scene, or inspects previously baked files.
//!
//! ## Usage
//!
//! ```bash
//! cargo run --release -p gibake-cli -- <SCENE> -bake <OUTPUT> [OPTIONS]
//! cargo run --release -p gibake-cli -- <SCENE> [<LIGHTMAPS>] [<PROBE_DATA>]
//! ```
//!
//! ## Environment Variables
//!
//! - `RUST_LOG`: Set log level (e.g., info, debug, trace)

mod args;
mod bake;
mod inspect;

use tracing_subscriber::EnvFilter;

use crate::args::Command;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let command = match Command::from_args() {
        Ok(command) => command,
        Err(e) => {
            eprintln!("error: {e}\n\nRun with -h for usage.");
            return Err(e.into());
        }
    };

    match command {
        Command::Help => {
            print_help();
            Ok(())
        }
        Command::Bake(options) => bake::run(&options),
        Command::Inspect(options) => inspect::run(&options),
    }
}

fn print_help() {
    eprintln!(
        "gibake - offline global illumination baker

USAGE:
    gibake <SCENE> -bake <OUTPUT> [OPTIONS]
    gibake <SCENE> [<LIGHTMAPS>] [<PROBE_DATA>]

The first form bakes, the second loads a scene with baked files and
reports on them.

LIGHTMAP OPTIONS:
    -bake <OUTPUT>          Lightmap file to write (one map per primitive)
    -irr <W> <H> <SPP>      Bake irradiance maps of W x H texels
    -ao <W> <H> <SPP>       Bake ambient occlusion maps of W x H texels
    -ao-dist <D>            Ambient occlusion ray length (default: 0.15)

LIGHTING OPTIONS:
    -light <STRENGTH>       Sun power (default: 5.0)
    -bounces <N>            Deepest path bounce (default: 10)

PROBE OPTIONS:
    -probes <OUTPUT> <X> <Y> <Z>
                            Place reflection probes on an X x Y x Z grid
                            and write the probe data file

OTHER:
    -debug <PNG> <W> <H> <SPP>
                            Render the scene through the path tracer
    -legacy-format          Write files without the version header
    -h, --help              Print this help message

EXAMPLES:
    # Irradiance and AO maps
    gibake sponza.gltf -bake sponza.lm -irr 128 128 256 -ao 256 256 64

    # Probes only
    gibake sponza.gltf -probes sponza.pd 8 4 8

    # Inspect baked files
    gibake sponza.gltf sponza.lm sponza.pd

ENVIRONMENT VARIABLES:
    RUST_LOG                Set log level (e.g., info, debug, trace)"
    );
}

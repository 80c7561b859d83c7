//! Command line parsing.
//!
//! Arguments are parsed completely before any work starts, so a bad flag
//! never leaves partial output behind.

use std::path::PathBuf;
use std::str::FromStr;

use gibake_bake::FormatVersion;
use glam::UVec3;
use thiserror::Error;

/// Default sun power for bakes.
pub const DEFAULT_LIGHT_STRENGTH: f32 = 5.0;
/// Default deepest path bounce for bakes.
pub const DEFAULT_MAX_BOUNCES: u32 = 10;
/// Default ambient occlusion ray length.
pub const DEFAULT_AO_DISTANCE: f32 = 0.15;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ArgsError {
    #[error("missing scene path")]
    MissingScene,
    #[error("{flag} expects {expected}")]
    MissingValue {
        flag: String,
        expected: &'static str,
    },
    #[error("invalid value '{value}' for {flag}")]
    InvalidValue { flag: String, value: String },
    #[error("unknown argument '{0}'")]
    Unknown(String),
    #[error("{0} requires -bake <output>")]
    RequiresBakeOutput(String),
    #[error("too many positional arguments, unexpected '{0}'")]
    UnexpectedPositional(String),
}

/// Size and sample count of one lightmap kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MapRequest {
    pub width: u32,
    pub height: u32,
    pub samples: u32,
}

/// Probe grid generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeRequest {
    pub output: PathBuf,
    pub grid: UVec3,
}

/// Camera render through the path tracer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DebugRequest {
    pub output: PathBuf,
    pub width: u32,
    pub height: u32,
    pub samples: u32,
}

/// Everything a bake run does.
#[derive(Debug, Clone, PartialEq)]
pub struct BakeOptions {
    pub scene: PathBuf,
    /// Lightmap file; `None` when only probes or a debug render are requested
    pub output: Option<PathBuf>,
    pub irradiance: Option<MapRequest>,
    pub ambient_occlusion: Option<MapRequest>,
    pub light_strength: f32,
    pub max_bounces: u32,
    pub ao_distance: f32,
    pub probes: Option<ProbeRequest>,
    pub debug: Option<DebugRequest>,
    pub format: FormatVersion,
}

impl BakeOptions {
    fn new(scene: PathBuf) -> Self {
        Self {
            scene,
            output: None,
            irradiance: None,
            ambient_occlusion: None,
            light_strength: DEFAULT_LIGHT_STRENGTH,
            max_bounces: DEFAULT_MAX_BOUNCES,
            ao_distance: DEFAULT_AO_DISTANCE,
            probes: None,
            debug: None,
            format: FormatVersion::default(),
        }
    }
}

/// Load a scene and previously baked files and report on them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InspectOptions {
    pub scene: PathBuf,
    pub lightmaps: Option<PathBuf>,
    pub probe_data: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Help,
    Bake(BakeOptions),
    Inspect(InspectOptions),
}

impl Command {
    /// Parse from the process arguments.
    pub fn from_args() -> Result<Self, ArgsError> {
        let args: Vec<String> = std::env::args().collect();
        Self::parse_args(&args)
    }

    /// Parse from a slice of arguments; `args[0]` is the program name.
    ///
    /// ```text
    /// gibake <scene> -bake <out.lm> [-ao w h spp] [-irr w h spp] [-light s]
    ///        [-bounces n] [-ao-dist d] [-probes <out.pd> gx gy gz]
    ///        [-debug <out.png> w h spp] [-legacy-format]
    /// gibake <scene> [<file.lm>] [<file.pd>]
    /// ```
    pub fn parse_args(args: &[String]) -> Result<Self, ArgsError> {
        if args.iter().skip(1).any(|arg| arg == "-h" || arg == "--help") {
            return Ok(Self::Help);
        }

        let mut positional = Vec::new();
        let mut bake: Option<BakeOptions> = None;
        let mut map_flags = Vec::new();

        let mut i = 1;
        while i < args.len() {
            let flag = args[i].as_str();
            let mut values = Values {
                args,
                flag,
                next: i + 1,
            };
            match flag {
                "-bake" => {
                    let output = values.path("<output>")?;
                    bake_options(&mut bake, &positional)?.output = Some(output);
                }
                "-ao" | "-irr" => {
                    let request = MapRequest {
                        width: values.parse("<width> <height> <samples>")?,
                        height: values.parse("<width> <height> <samples>")?,
                        samples: values.parse("<width> <height> <samples>")?,
                    };
                    let options = bake_options(&mut bake, &positional)?;
                    if flag == "-ao" {
                        options.ambient_occlusion = Some(request);
                    } else {
                        options.irradiance = Some(request);
                    }
                    map_flags.push(flag.to_owned());
                }
                "-light" => {
                    let strength = values.parse("<strength>")?;
                    bake_options(&mut bake, &positional)?.light_strength = strength;
                }
                "-bounces" => {
                    let bounces = values.parse("<count>")?;
                    bake_options(&mut bake, &positional)?.max_bounces = bounces;
                }
                "-ao-dist" => {
                    let distance: f32 = values.parse("<distance>")?;
                    if distance <= 0.0 || !distance.is_finite() {
                        return Err(ArgsError::InvalidValue {
                            flag: flag.to_owned(),
                            value: distance.to_string(),
                        });
                    }
                    bake_options(&mut bake, &positional)?.ao_distance = distance;
                }
                "-probes" => {
                    let expected = "<output> <x> <y> <z>";
                    let output = values.path(expected)?;
                    let grid = UVec3::new(
                        values.parse(expected)?,
                        values.parse(expected)?,
                        values.parse(expected)?,
                    );
                    let request = ProbeRequest { output, grid };
                    bake_options(&mut bake, &positional)?.probes = Some(request);
                }
                "-debug" => {
                    let expected = "<output> <width> <height> <samples>";
                    let request = DebugRequest {
                        output: values.path(expected)?,
                        width: values.parse(expected)?,
                        height: values.parse(expected)?,
                        samples: values.parse(expected)?,
                    };
                    bake_options(&mut bake, &positional)?.debug = Some(request);
                }
                "-legacy-format" => {
                    bake_options(&mut bake, &positional)?.format = FormatVersion::V0;
                }
                _ if flag.starts_with('-') && flag.len() > 1 => {
                    return Err(ArgsError::Unknown(flag.to_owned()));
                }
                _ => {
                    if bake.is_some() || positional.len() == 3 {
                        return Err(ArgsError::UnexpectedPositional(flag.to_owned()));
                    }
                    positional.push(PathBuf::from(flag));
                }
            }
            i = values.next;
        }

        if let Some(options) = bake {
            if options.output.is_none() {
                if let Some(flag) = map_flags.into_iter().next() {
                    return Err(ArgsError::RequiresBakeOutput(flag));
                }
            }
            return Ok(Self::Bake(options));
        }

        let mut positional = positional.into_iter();
        let scene = positional.next().ok_or(ArgsError::MissingScene)?;
        Ok(Self::Inspect(InspectOptions {
            scene,
            lightmaps: positional.next(),
            probe_data: positional.next(),
        }))
    }
}

/// Switch to bake mode on the first bake flag. The scene must come first.
fn bake_options<'a>(
    bake: &'a mut Option<BakeOptions>,
    positional: &[PathBuf],
) -> Result<&'a mut BakeOptions, ArgsError> {
    if bake.is_none() {
        let scene = match positional {
            [] => return Err(ArgsError::MissingScene),
            [scene] => scene.clone(),
            [_, extra, ..] => {
                return Err(ArgsError::UnexpectedPositional(
                    extra.display().to_string(),
                ))
            }
        };
        *bake = Some(BakeOptions::new(scene));
    }
    bake.as_mut().ok_or(ArgsError::MissingScene)
}

/// Cursor over the values following a flag.
struct Values<'a> {
    args: &'a [String],
    flag: &'a str,
    next: usize,
}

impl<'a> Values<'a> {
    fn raw(&mut self, expected: &'static str) -> Result<&'a str, ArgsError> {
        let args = self.args;
        let value = args
            .get(self.next)
            .filter(|v| v.parse::<f64>().is_ok() || !v.starts_with('-'))
            .ok_or_else(|| ArgsError::MissingValue {
                flag: self.flag.to_owned(),
                expected,
            })?;
        self.next += 1;
        Ok(value.as_str())
    }

    fn path(&mut self, expected: &'static str) -> Result<PathBuf, ArgsError> {
        self.raw(expected).map(PathBuf::from)
    }

    fn parse<T: FromStr>(&mut self, expected: &'static str) -> Result<T, ArgsError> {
        let flag = self.flag;
        let value = self.raw(expected)?;
        value.parse().map_err(|_| ArgsError::InvalidValue {
            flag: flag.to_owned(),
            value: value.to_owned(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(line: &str) -> Vec<String> {
        std::iter::once("gibake")
            .chain(line.split_whitespace())
            .map(String::from)
            .collect()
    }

    fn bake(line: &str) -> BakeOptions {
        match Command::parse_args(&args(line)) {
            Ok(Command::Bake(options)) => options,
            other => panic!("expected bake options, got {other:?}"),
        }
    }

    #[test]
    fn full_bake_line() {
        let options = bake("scene.gltf -bake out.lm -ao 64 32 16 -irr 128 128 256 -light 2.5");
        assert_eq!(options.scene, PathBuf::from("scene.gltf"));
        assert_eq!(options.output, Some(PathBuf::from("out.lm")));
        assert_eq!(
            options.ambient_occlusion,
            Some(MapRequest { width: 64, height: 32, samples: 16 })
        );
        assert_eq!(
            options.irradiance,
            Some(MapRequest { width: 128, height: 128, samples: 256 })
        );
        assert_eq!(options.light_strength, 2.5);
        assert_eq!(options.max_bounces, DEFAULT_MAX_BOUNCES);
        assert_eq!(options.ao_distance, DEFAULT_AO_DISTANCE);
        assert_eq!(options.format, FormatVersion::V1);
    }

    #[test]
    fn defaults() {
        let options = bake("scene.gltf -bake out.lm");
        assert_eq!(options.light_strength, DEFAULT_LIGHT_STRENGTH);
        assert!(options.irradiance.is_none());
        assert!(options.ambient_occlusion.is_none());
        assert!(options.probes.is_none());
    }

    #[test]
    fn extra_flags() {
        let options = bake(
            "scene.gltf -bounces 3 -ao-dist 0.5 -probes p.pd 8 4 8 -debug d.png 320 200 16 -legacy-format",
        );
        assert_eq!(options.output, None);
        assert_eq!(options.max_bounces, 3);
        assert_eq!(options.ao_distance, 0.5);
        assert_eq!(
            options.probes,
            Some(ProbeRequest { output: PathBuf::from("p.pd"), grid: UVec3::new(8, 4, 8) })
        );
        assert_eq!(options.debug.map(|d| (d.width, d.height, d.samples)), Some((320, 200, 16)));
        assert_eq!(options.format, FormatVersion::V0);
    }

    #[test]
    fn missing_sub_arguments() {
        assert_eq!(
            Command::parse_args(&args("scene.gltf -bake out.lm -ao 64 32")),
            Err(ArgsError::MissingValue {
                flag: "-ao".to_owned(),
                expected: "<width> <height> <samples>"
            })
        );
        assert!(matches!(
            Command::parse_args(&args("scene.gltf -bake")),
            Err(ArgsError::MissingValue { .. })
        ));
        assert!(matches!(
            Command::parse_args(&args("scene.gltf -bake out.lm -irr 4 -ao 4 4 4")),
            Err(ArgsError::MissingValue { .. })
        ));
    }

    #[test]
    fn invalid_values() {
        assert_eq!(
            Command::parse_args(&args("scene.gltf -bake out.lm -light bright")),
            Err(ArgsError::InvalidValue {
                flag: "-light".to_owned(),
                value: "bright".to_owned()
            })
        );
        assert!(Command::parse_args(&args("scene.gltf -bake out.lm -ao-dist -1")).is_err());
        assert!(Command::parse_args(&args("scene.gltf -bake out.lm -ao -4 4 4")).is_err());
    }

    #[test]
    fn maps_need_an_output() {
        assert_eq!(
            Command::parse_args(&args("scene.gltf -irr 4 4 4")),
            Err(ArgsError::RequiresBakeOutput("-irr".to_owned()))
        );
    }

    #[test]
    fn scene_comes_first() {
        assert_eq!(
            Command::parse_args(&args("-bake out.lm")),
            Err(ArgsError::MissingScene)
        );
        assert_eq!(Command::parse_args(&args("")), Err(ArgsError::MissingScene));
        assert!(matches!(
            Command::parse_args(&args("scene.gltf -bake out.lm stray")),
            Err(ArgsError::UnexpectedPositional(_))
        ));
    }

    #[test]
    fn unknown_flag() {
        assert_eq!(
            Command::parse_args(&args("scene.gltf -bake out.lm -fast")),
            Err(ArgsError::Unknown("-fast".to_owned()))
        );
    }

    #[test]
    fn inspect_mode() {
        assert_eq!(
            Command::parse_args(&args("scene.gltf baked.lm baked.pd")),
            Ok(Command::Inspect(InspectOptions {
                scene: PathBuf::from("scene.gltf"),
                lightmaps: Some(PathBuf::from("baked.lm")),
                probe_data: Some(PathBuf::from("baked.pd")),
            }))
        );
        assert_eq!(
            Command::parse_args(&args("scene.gltf")),
            Ok(Command::Inspect(InspectOptions {
                scene: PathBuf::from("scene.gltf"),
                lightmaps: None,
                probe_data: None,
            }))
        );
    }

    #[test]
    fn help_wins() {
        assert_eq!(Command::parse_args(&args("scene.gltf -bake -h")), Ok(Command::Help));
    }
}

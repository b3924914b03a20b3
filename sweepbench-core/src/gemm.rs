//! GEMM Sweep Parameters
//!
//! Options for GEMM-class executables such as `cublaslt_gemm`. Shapes, batch
//! sizes and input data types are swept as a cross product, each combination
//! producing one command:
//!
//! ```text
//! shapes ["2:8:*2,64,64"]  batch "0:2:1"  in_types [fp16, fp32]
//!        3 shapes        ×  3 batches   ×  2 types   = 18 commands
//! ```

use crate::binary::BenchmarkBinary;
use crate::command::{Command, build_gemm_command};
use crate::error::ConfigError;
use crate::sweep::{MAX_SWEEP_LEN, ShapeAxis, Sweep, cross_product, parse_range};
use serde::{Deserialize, Serialize};

/// Input data types supported by `cublaslt_gemm`
pub const CUBLASLT_IN_TYPES: &[&str] = &[
    "fp64", "fp32", "fp16", "bf16", "fp8e4m3", "fp8e5m2", "fp4e2m1", "int8",
];

/// Raw GEMM options as supplied by the user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GemmOptions {
    /// Shapes in `m,n,k` form; each dimension may be a range (`2:128:*2`)
    #[serde(default = "default_shapes")]
    pub shapes: Vec<String>,
    /// Batch size or range for strided batch GEMM, `0` disables batching
    #[serde(default = "default_batch")]
    pub batch: String,
    /// Input data types to sweep
    #[serde(default = "default_in_types")]
    pub in_types: Vec<String>,
    /// Warmup steps
    #[serde(default = "default_num_warmup")]
    pub num_warmup: u32,
    /// Measured steps
    #[serde(default = "default_num_steps")]
    pub num_steps: u32,
    /// Run an exhaustive autotune pass to find the best algorithm
    #[serde(default)]
    pub enable_autotune: bool,
    /// Warmup steps for autotune
    #[serde(default = "default_num_warmup")]
    pub num_warmup_autotune: u32,
    /// Measured steps for autotune
    #[serde(default = "default_num_steps")]
    pub num_steps_autotune: u32,
}

impl Default for GemmOptions {
    fn default() -> Self {
        Self {
            shapes: default_shapes(),
            batch: default_batch(),
            in_types: default_in_types(),
            num_warmup: default_num_warmup(),
            num_steps: default_num_steps(),
            enable_autotune: false,
            num_warmup_autotune: default_num_warmup(),
            num_steps_autotune: default_num_steps(),
        }
    }
}

fn default_shapes() -> Vec<String> {
    [2048, 4096, 8192]
        .iter()
        .map(|x| format!("{x},{x},{x}"))
        .collect()
}
fn default_batch() -> String {
    "0".to_string()
}
fn default_in_types() -> Vec<String> {
    vec!["fp8e4m3".to_string()]
}
fn default_num_warmup() -> u32 {
    20
}
fn default_num_steps() -> u32 {
    50
}

/// Matrix dimensions of one GEMM
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GemmDims {
    /// Rows of A and C
    pub m: u64,
    /// Columns of B and C
    pub n: u64,
    /// Shared dimension
    pub k: u64,
}

/// Autotune pass settings, present only when autotuning is enabled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Autotune {
    /// Warmup steps
    pub num_warmup: u32,
    /// Measured steps
    pub num_steps: u32,
}

/// One concrete GEMM run drawn from the sweep
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GemmRun {
    /// Matrix dimensions
    pub dims: GemmDims,
    /// Batch count
    pub batch: u64,
    /// Input data type
    pub in_type: String,
}

/// Validated GEMM sweep
#[derive(Debug, Clone, PartialEq)]
pub struct GemmParams {
    /// Executable identity
    pub binary: BenchmarkBinary,
    /// Shape axis (slowest)
    pub shapes: ShapeAxis<GemmDims>,
    /// Batch axis
    pub batches: ShapeAxis<u64>,
    /// Data type axis (fastest)
    pub in_types: ShapeAxis<String>,
    /// Warmup steps
    pub num_warmup: u32,
    /// Measured steps
    pub num_steps: u32,
    /// Autotune pass, if enabled
    pub autotune: Option<Autotune>,
}

impl GemmParams {
    /// Enumerate all runs: shape varies slowest, data type fastest.
    pub fn runs(&self) -> Vec<GemmRun> {
        Sweep::from_lens([self.shapes.len(), self.batches.len(), self.in_types.len()])
            .iter()
            .map(|idx| GemmRun {
                dims: self.shapes.values()[idx[0]],
                batch: self.batches.values()[idx[1]],
                in_type: self.in_types.values()[idx[2]].clone(),
            })
            .collect()
    }

    /// One command per run, in enumeration order.
    pub fn commands(&self) -> Vec<Command> {
        self.runs()
            .iter()
            .map(|run| build_gemm_command(run, self))
            .collect()
    }
}

impl GemmOptions {
    /// Validate the options against the data types the executable supports.
    pub fn validate(
        &self,
        binary: BenchmarkBinary,
        supported_types: &[&str],
    ) -> Result<GemmParams, ConfigError> {
        for ty in &self.in_types {
            if !supported_types.contains(&ty.as_str()) {
                return Err(ConfigError::UnsupportedDataType {
                    ty: ty.clone(),
                    supported: supported_types.iter().map(|s| s.to_string()).collect(),
                });
            }
        }

        let mut shapes = Vec::new();
        for shape in &self.shapes {
            shapes.extend(parse_shape(shape)?);
            if shapes.len() > MAX_SWEEP_LEN {
                return Err(ConfigError::SweepTooLarge {
                    limit: MAX_SWEEP_LEN,
                });
            }
        }

        let shapes = ShapeAxis::new("shape", shapes)?;
        let batches = ShapeAxis::new("batch", parse_range(&self.batch)?)?;
        let in_types = ShapeAxis::new("in_type", self.in_types.clone())?;
        Sweep::new(vec![shapes.len(), batches.len(), in_types.len()])?;

        Ok(GemmParams {
            binary,
            shapes,
            batches,
            in_types,
            num_warmup: self.num_warmup,
            num_steps: self.num_steps,
            autotune: self.enable_autotune.then_some(Autotune {
                num_warmup: self.num_warmup_autotune,
                num_steps: self.num_steps_autotune,
            }),
        })
    }
}

/// Expand an `m,n,k` shape whose dimensions may be ranges.
pub fn parse_shape(shape: &str) -> Result<Vec<GemmDims>, ConfigError> {
    let dims: Vec<&str> = shape.split(',').collect();
    let [m, n, k] = dims.as_slice() else {
        return Err(ConfigError::InvalidShape(shape.to_string()));
    };

    let axes = [
        ShapeAxis::new("m", parse_range(m)?)?,
        ShapeAxis::new("n", parse_range(n)?)?,
        ShapeAxis::new("k", parse_range(k)?)?,
    ];
    Sweep::new(axes.iter().map(ShapeAxis::len).collect())?;
    Ok(cross_product(&axes)
        .into_iter()
        .map(|v| GemmDims {
            m: v[0],
            n: v[1],
            k: v[2],
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn binary() -> BenchmarkBinary {
        BenchmarkBinary::new("cublaslt-gemm", "cublaslt_gemm", "/mock/bin").unwrap()
    }

    #[test]
    fn test_default_options() {
        let params = GemmOptions::default()
            .validate(binary(), CUBLASLT_IN_TYPES)
            .unwrap();
        assert_eq!(params.shapes.len(), 3);
        assert_eq!(params.batches.values(), &[0]);
        assert_eq!(params.in_types.values(), &["fp8e4m3".to_string()]);
        assert_eq!(params.num_warmup, 20);
        assert_eq!(params.num_steps, 50);
        assert_eq!(params.autotune, None);
        assert_eq!(params.runs().len(), 3);
    }

    #[test]
    fn test_unsupported_type() {
        let options = GemmOptions {
            in_types: vec!["fp16".to_string(), "fp12".to_string()],
            ..Default::default()
        };
        let err = options.validate(binary(), CUBLASLT_IN_TYPES).unwrap_err();
        assert!(matches!(err, ConfigError::UnsupportedDataType { ref ty, .. } if ty == "fp12"));
    }

    #[test]
    fn test_parse_shape_with_range() {
        let dims = parse_shape("2:8:*2,64,32").unwrap();
        assert_eq!(
            dims,
            vec![
                GemmDims { m: 2, n: 64, k: 32 },
                GemmDims { m: 4, n: 64, k: 32 },
                GemmDims { m: 8, n: 64, k: 32 },
            ]
        );
        assert!(matches!(
            parse_shape("64,64"),
            Err(ConfigError::InvalidShape(_))
        ));
    }

    #[test]
    fn test_oversized_sweep_rejected() {
        assert_eq!(
            parse_shape("1:60000:1,1:60000:1,64").unwrap_err(),
            ConfigError::SweepTooLarge {
                limit: MAX_SWEEP_LEN
            }
        );

        // Each axis is fine on its own; the product is not
        let options = GemmOptions {
            shapes: vec!["1:1024:1,64,64".to_string()],
            batch: "1:2048:1".to_string(),
            ..Default::default()
        };
        let err = options.validate(binary(), CUBLASLT_IN_TYPES).unwrap_err();
        assert!(matches!(err, ConfigError::SweepTooLarge { .. }));
        assert_eq!(err.code(), crate::outcome::ReturnCode::InvalidArgument);
    }

    #[test]
    fn test_sweep_cardinality_and_order() {
        let options = GemmOptions {
            shapes: vec!["2:8:*2,64,64".to_string()],
            batch: "0:2:1".to_string(),
            in_types: vec!["fp16".to_string(), "fp32".to_string()],
            ..Default::default()
        };
        let params = options.validate(binary(), CUBLASLT_IN_TYPES).unwrap();
        let runs = params.runs();
        assert_eq!(runs.len(), 3 * 3 * 2);

        assert_eq!(runs[0].dims.m, 2);
        assert_eq!(runs[0].batch, 0);
        assert_eq!(runs[0].in_type, "fp16");
        assert_eq!(runs[1].in_type, "fp32");
        assert_eq!(runs[2].batch, 1);
        assert_eq!(runs[17].dims.m, 8);
        assert_eq!(runs[17].batch, 2);
        assert_eq!(runs[17].in_type, "fp32");

        assert_eq!(params.runs(), runs);
    }

    #[test]
    fn test_autotune_enabled() {
        let options = GemmOptions {
            enable_autotune: true,
            num_warmup_autotune: 5,
            ..Default::default()
        };
        let params = options.validate(binary(), CUBLASLT_IN_TYPES).unwrap();
        assert_eq!(
            params.autotune,
            Some(Autotune {
                num_warmup: 5,
                num_steps: 50
            })
        );
    }

    #[test]
    fn test_empty_in_types() {
        let options = GemmOptions {
            in_types: vec![],
            ..Default::default()
        };
        assert_eq!(
            options.validate(binary(), CUBLASLT_IN_TYPES).unwrap_err(),
            ConfigError::EmptyAxis("in_type".to_string())
        );
    }
}

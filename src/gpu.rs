//! GPU memory report.
//!
//! Parses the CSV line produced by
//! `nvidia-smi --query-gpu=name,memory.used,memory.total --format=csv,noheader,nounits`.

use std::fmt;

use crate::error::{BootstrapError, Result};

/// Name and memory usage of one accelerator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GpuReport {
    pub name: String,
    pub used_mib: u64,
    pub total_mib: u64,
}

impl GpuReport {
    /// Parse the first device line of the query output.
    pub fn parse(output: &str) -> Result<Self> {
        let line = output
            .lines()
            .map(str::trim)
            .find(|l| !l.is_empty())
            .ok_or_else(|| BootstrapError::no_accelerator("no GPU reported"))?;

        let mut fields = line.rsplitn(3, ',').map(str::trim);
        let (Some(total), Some(used), Some(name)) = (fields.next(), fields.next(), fields.next())
        else {
            return Err(BootstrapError::no_accelerator(format!(
                "unexpected GPU query output: {:?}",
                line
            )));
        };

        let parse_mib = |field: &str| {
            field.parse::<u64>().map_err(|_| {
                BootstrapError::no_accelerator(format!(
                    "unexpected GPU query output: {:?}",
                    line
                ))
            })
        };

        Ok(Self {
            name: name.to_string(),
            used_mib: parse_mib(used)?,
            total_mib: parse_mib(total)?,
        })
    }

    /// Used memory as a percentage of total.
    pub fn used_percent(&self) -> f64 {
        if self.total_mib == 0 {
            0.0
        } else {
            self.used_mib as f64 * 100.0 / self.total_mib as f64
        }
    }
}

impl fmt::Display for GpuReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "GPU: {} | memory used: {} MiB / {} MiB ({:.1}%)",
            self.name,
            self.used_mib,
            self.total_mib,
            self.used_percent()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_single_device() {
        let report = GpuReport::parse("Tesla T4, 1024, 15360\n").unwrap();
        assert_eq!(report.name, "Tesla T4");
        assert_eq!(report.used_mib, 1024);
        assert_eq!(report.total_mib, 15360);
        assert_eq!(
            report.to_string(),
            "GPU: Tesla T4 | memory used: 1024 MiB / 15360 MiB (6.7%)"
        );
    }

    #[test]
    fn test_first_device_wins() {
        let report = GpuReport::parse("\nNVIDIA A100-SXM4-40GB, 0, 40960\nTesla T4, 5, 15360\n").unwrap();
        assert_eq!(report.name, "NVIDIA A100-SXM4-40GB");
        assert_eq!(report.used_percent(), 0.0);
    }

    #[test]
    fn test_empty_output_is_no_accelerator() {
        let err = GpuReport::parse("").unwrap_err();
        assert!(matches!(err, BootstrapError::NoAccelerator(_)));
    }

    #[test]
    fn test_garbage_output_is_no_accelerator() {
        assert!(GpuReport::parse("No devices were found").is_err());
        assert!(GpuReport::parse("Tesla T4, [N/A], 15360").is_err());
    }

    #[test]
    fn test_zero_total() {
        let report = GpuReport {
            name: "x".to_string(),
            used_mib: 3,
            total_mib: 0,
        };
        assert_eq!(report.used_percent(), 0.0);
    }
}

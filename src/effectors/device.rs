//! Device effectors: GPU compute, sensors and camera.
//!
//! Real shader execution is outside this crate; [`GpuBackend`] is the
//! seam a host plugs a backend into. Sensors and camera are simulated.

use std::time::{SystemTime, UNIX_EPOCH};

use tracing::info;

use crate::error::GuardError;

/// Frame returned by the simulated camera.
pub const SIMULATED_FRAME: &[u8] = b"Simulated image data";

/// Runs a compute shader over a byte buffer.
pub trait GpuBackend: Send + Sync {
    fn compute(&self, shader_code: &str, data: &[u8]) -> Result<Vec<u8>, GuardError>;
}

/// Backend for hosts without a GPU adapter. Always unavailable.
#[derive(Debug, Default)]
pub struct NoGpu;

impl GpuBackend for NoGpu {
    fn compute(&self, _shader_code: &str, _data: &[u8]) -> Result<Vec<u8>, GuardError> {
        Err(GuardError::ProviderUnavailable(
            "no GPU adapter available".to_string(),
        ))
    }
}

/// Reads one simulated sensor value.
pub fn read_sensor(sensor_type: &str) -> Result<f64, GuardError> {
    info!(sensor_type, "Reading sensor");
    match sensor_type {
        "temperature" => Ok(23.5),
        "humidity" => Ok(45.0),
        "timestamp" => SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs_f64())
            .map_err(|e| GuardError::InvalidRequest(format!("clock error: {e}"))),
        other => Err(GuardError::InvalidRequest(format!(
            "unsupported sensor type: {other}"
        ))),
    }
}

/// Captures one simulated camera frame.
pub fn capture_camera() -> Vec<u8> {
    info!("Capturing camera frame");
    SIMULATED_FRAME.to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_gpu_is_unavailable() {
        let err = NoGpu.compute("@compute fn main() {}", b"data").unwrap_err();
        assert!(matches!(err, GuardError::ProviderUnavailable(_)));
    }

    #[test]
    fn test_sensor_values() {
        assert_eq!(read_sensor("temperature").unwrap(), 23.5);
        assert_eq!(read_sensor("humidity").unwrap(), 45.0);
        assert!(read_sensor("timestamp").unwrap() > 1_600_000_000.0);
        assert!(matches!(
            read_sensor("radiation"),
            Err(GuardError::InvalidRequest(_))
        ));
    }

    #[test]
    fn test_camera_frame() {
        assert_eq!(capture_camera(), b"Simulated image data");
    }
}

//! File output for facility reports.
//!
//! Handles writing report data to files with optional compression.

use std::path::Path;

use surveyguard_core::{FacilityReport, Result, SurveyError};

/// Saves a report to file, compressed when requested.
pub async fn save_report(report: &FacilityReport, output_path: &Path, compress: bool) -> Result<()> {
    let json_data = to_json(report)?;

    if compress {
        #[cfg(feature = "compression")]
        {
            save_compressed(&json_data, output_path).await
        }
        #[cfg(not(feature = "compression"))]
        {
            Err(SurveyError::configuration(
                "Compression not available. Compile with --features compression",
            ))
        }
    } else {
        save_json(&json_data, output_path).await
    }
}

/// Serializes any report value as pretty JSON.
pub fn to_json<T: serde::Serialize>(value: &T) -> Result<String> {
    serde_json::to_string_pretty(value).map_err(|e| SurveyError::Serialization {
        context: "Report serialization".to_string(),
        source: e,
    })
}

/// Saves JSON data to file.
pub async fn save_json(json_data: &str, output_path: &Path) -> Result<()> {
    tokio::fs::write(output_path, json_data)
        .await
        .map_err(|e| SurveyError::io(format!("Failed to write to {}", output_path.display()), e))
}

/// Saves compressed JSON data.
#[cfg(feature = "compression")]
async fn save_compressed(json_data: &str, output_path: &Path) -> Result<()> {
    use std::io::Write;

    let mut encoder = zstd::Encoder::new(Vec::new(), 3)
        .map_err(|e| SurveyError::configuration(format!("Failed to create compressor: {}", e)))?;

    encoder
        .write_all(json_data.as_bytes())
        .map_err(|e| SurveyError::configuration(format!("Compression failed: {}", e)))?;

    let compressed_data = encoder.finish().map_err(|e| {
        SurveyError::configuration(format!("Compression finalization failed: {}", e))
    })?;

    tokio::fs::write(output_path, compressed_data)
        .await
        .map_err(|e| {
            SurveyError::io(
                format!("Failed to write compressed file to {}", output_path.display()),
                e,
            )
        })
}

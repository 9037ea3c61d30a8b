use crate::api::error::AppError;
use crate::config::{FormatTable, GatewayConfig};
use crate::models::{ConversionArtifact, Upload};
use crate::services::converter::{ConversionJob, MediaConverter};
use crate::services::staging::StagingArea;
use crate::utils::validation::{file_extension, file_stem, normalize_target_format, sanitize_filename};
use std::sync::Arc;
use std::time::Instant;
use tokio::io::AsyncRead;
use tokio::sync::Semaphore;

/// Upload staging, format validation and the bounded call into the converter.
pub struct ConversionService {
    staging: Arc<StagingArea>,
    converter: Arc<dyn MediaConverter>,
    formats: FormatTable,
    max_file_size: usize,
    permits: Arc<Semaphore>,
}

impl ConversionService {
    pub fn new(
        staging: Arc<StagingArea>,
        converter: Arc<dyn MediaConverter>,
        config: &GatewayConfig,
    ) -> Self {
        Self {
            staging,
            converter,
            formats: config.formats.clone(),
            max_file_size: config.max_file_size,
            permits: Arc::new(Semaphore::new(config.max_concurrent_conversions.max(1))),
        }
    }

    pub fn formats(&self) -> &FormatTable {
        &self.formats
    }

    pub fn converter(&self) -> &Arc<dyn MediaConverter> {
        &self.converter
    }

    /// Streams an upload into the staging directory under a fresh id.
    pub async fn upload_to_staging<R>(
        &self,
        original_filename: &str,
        reader: &mut R,
    ) -> Result<Upload, AppError>
    where
        R: AsyncRead + Unpin + ?Sized,
    {
        let sanitized_filename =
            sanitize_filename(original_filename).map_err(|e| AppError::BadRequest(e.message))?;
        let id = StagingArea::new_id();

        let (file, size) = self
            .staging
            .persist(&id, &sanitized_filename, reader)
            .await
            .map_err(|e| {
                if e.to_string().contains("length limit exceeded") {
                    AppError::PayloadTooLarge(
                        "Request body exceeds the maximum allowed limit".to_string(),
                    )
                } else {
                    AppError::Internal(format!("Failed to stage upload: {}", e))
                }
            })?;

        if size > self.max_file_size as u64 {
            return Err(AppError::PayloadTooLarge(
                "File size limits exceeded".to_string(),
            ));
        }

        tracing::info!(
            "📥 Staged upload {} as {} ({} bytes)",
            original_filename,
            id,
            size
        );

        Ok(Upload {
            id,
            original_filename: original_filename.to_string(),
            sanitized_filename,
            size,
            file,
        })
    }

    /// Validates the requested format pair and runs the converter.
    ///
    /// The upload is consumed: its staged bytes are gone when this returns, whatever
    /// the outcome. On error the partially written artifact is removed as well.
    pub async fn convert(
        &self,
        upload: Upload,
        target_format: &str,
        output_name: Option<&str>,
    ) -> Result<ConversionArtifact, AppError> {
        let input_ext = file_extension(&upload.sanitized_filename);
        let output_ext = normalize_target_format(target_format).ok_or_else(|| {
            AppError::BadRequest("target_format is required (e.g., mp4, mp3)".to_string())
        })?;

        if !self.formats.is_allowed(&input_ext, &output_ext) {
            return Err(AppError::BadRequest(format!(
                "unsupported conversion: {} -> {}",
                input_ext, output_ext
            )));
        }

        let base_name = match output_name.map(str::trim).filter(|n| !n.is_empty()) {
            Some(requested) => {
                sanitize_filename(requested).map_err(|e| AppError::BadRequest(e.message))?
            }
            None => file_stem(&upload.sanitized_filename).to_string(),
        };
        let download_name = format!("{}.{}", base_name, output_ext);

        // Same-format requests would otherwise make ffmpeg write over its own input.
        let target = self
            .staging
            .path_for(&upload.id, &download_name)
            .map_err(|e| AppError::BadRequest(e.to_string()))?;
        let staged_name = if target == upload.file.path() {
            format!("out_{}", download_name)
        } else {
            download_name.clone()
        };
        let artifact = self
            .staging
            .reserve(&upload.id, &staged_name)
            .map_err(|e| AppError::BadRequest(e.to_string()))?;

        let job = ConversionJob {
            input: upload.file.path().to_path_buf(),
            output: artifact.path().to_path_buf(),
            drop_video: self.formats.is_audio_only(&output_ext),
        };

        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|e| AppError::Internal(format!("Conversion limiter closed: {}", e)))?;

        tracing::info!(
            "🎬 Converting {} [{}] ({} bytes, {} -> {}, drop_video={})",
            upload.original_filename,
            upload.id,
            upload.size,
            input_ext,
            output_ext,
            job.drop_video
        );
        let started = Instant::now();

        if let Err(e) = self.converter.convert(&job).await {
            tracing::warn!("❌ Conversion {} failed: {}", upload.id, e);
            return Err(e.into());
        }

        tracing::info!(
            "✅ Converted {} to {} in {:?}",
            upload.id,
            download_name,
            started.elapsed()
        );

        Ok(ConversionArtifact {
            id: upload.id,
            download_name,
            extension: output_ext,
            file: artifact,
        })
    }
}

//! Responsive image pipeline.
//!
//! Every `.jpg`, `.jpeg` or `.png` in the source directory becomes one lossy
//! WebP per configured width plus a single JPEG fallback, written flat into
//! the output directory as `<name>-<width>w.<ext>`. Planning (which files to
//! write, at what size) is pure; encoding lives behind the `optimize`
//! feature.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const SOURCE_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];

/// Pipeline settings (`optimize` section of `folio.json`)
///
/// ```
/// let cfg = folio::optimize::OptimizeConfig::default();
/// assert_eq!(cfg.widths, vec![400, 800, 1200, 1600]);
/// assert_eq!(cfg.fallback_width, 800);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizeConfig {
    pub src_dir: PathBuf,
    pub out_dir: PathBuf,
    /// Target widths of the WebP variants
    pub widths: Vec<u32>,
    pub webp_quality: u8,
    pub jpeg_quality: u8,
    /// Width of the single JPEG fallback
    pub fallback_width: u32,
}

impl Default for OptimizeConfig {
    fn default() -> Self {
        Self {
            src_dir: PathBuf::from("src/images"),
            out_dir: PathBuf::from("public/images"),
            widths: vec![400, 800, 1200, 1600],
            webp_quality: 80,
            jpeg_quality: 80,
            fallback_width: 800,
        }
    }
}

impl OptimizeConfig {
    pub fn validate(&self) -> Result<()> {
        if self.widths.is_empty() || self.widths.contains(&0) {
            return Err(Error::ConfigError("widths must be non-empty and non-zero".into()));
        }
        if self.fallback_width == 0 {
            return Err(Error::ConfigError("fallback_width must be non-zero".into()));
        }
        for (name, q) in [("webp_quality", self.webp_quality), ("jpeg_quality", self.jpeg_quality)] {
            if !(1..=100).contains(&q) {
                return Err(Error::ConfigError(format!("{} must be within 1..=100, got {}", name, q)));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum OutputFormat {
    WebP,
    Jpeg,
}

impl OutputFormat {
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::WebP => "webp",
            OutputFormat::Jpeg => "jpg",
        }
    }
}

/// One file the pipeline writes for a source image
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Variant {
    pub width: u32,
    pub format: OutputFormat,
    pub quality: u8,
    pub file_name: String,
}

/// Outcome of a pipeline run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct OptimizeSummary {
    /// Source file names that were fully processed
    pub processed: Vec<String>,
    pub written: Vec<PathBuf>,
    /// Sources that failed, with the reason
    pub failures: Vec<(PathBuf, String)>,
}

impl OptimizeSummary {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Whether `path` has one of the source extensions (any case)
pub fn is_source_image(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| SOURCE_EXTENSIONS.iter().any(|s| e.eq_ignore_ascii_case(s)))
        .unwrap_or(false)
}

pub fn variant_file_name(stem: &str, width: u32, format: OutputFormat) -> String {
    format!("{}-{}w.{}", stem, width, format.extension())
}

/// The WebP variants in configured order, followed by the JPEG fallback
pub fn plan_variants(stem: &str, config: &OptimizeConfig) -> Vec<Variant> {
    let mut plan: Vec<Variant> = config
        .widths
        .iter()
        .map(|&width| Variant {
            width,
            format: OutputFormat::WebP,
            quality: config.webp_quality,
            file_name: variant_file_name(stem, width, OutputFormat::WebP),
        })
        .collect();
    plan.push(Variant {
        width: config.fallback_width,
        format: OutputFormat::Jpeg,
        quality: config.jpeg_quality,
        file_name: variant_file_name(stem, config.fallback_width, OutputFormat::Jpeg),
    });
    plan
}

/// Height that keeps the aspect ratio of `width` x `height` at
/// `target_width`, never below one pixel
pub fn scaled_height(width: u32, height: u32, target_width: u32) -> u32 {
    if width == 0 {
        return 1;
    }
    let h = (height as f64 * target_width as f64 / width as f64).round() as u32;
    h.max(1)
}

/// Source images directly inside `dir`, sorted by file name
pub fn find_sources(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut sources = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && is_source_image(&path) {
            sources.push(path);
        } else {
            log::debug!("skipping {}", path.display());
        }
    }
    sources.sort();
    Ok(sources)
}

fn file_stem(path: &Path) -> Result<&str> {
    path.file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(|| Error::ImageError {
            path: path.display().to_string(),
            reason: "file name is not valid UTF-8".into(),
        })
}

#[cfg(feature = "optimize")]
mod encode {
    use super::{file_stem, plan_variants, scaled_height, OptimizeConfig, OutputFormat, Variant};
    use crate::{Error, Result};
    use image::codecs::jpeg::JpegEncoder;
    use image::imageops::FilterType;
    use image::{DynamicImage, GenericImageView};
    use std::fs::File;
    use std::io::BufWriter;
    use std::path::{Path, PathBuf};
    use webp_animation::{Encoder, EncoderOptions, EncodingConfig};

    fn image_error(path: &Path, reason: impl ToString) -> Error {
        Error::ImageError {
            path: path.display().to_string(),
            reason: reason.to_string(),
        }
    }

    fn resize(img: &DynamicImage, target_width: u32) -> DynamicImage {
        let (w, h) = img.dimensions();
        img.resize_exact(target_width, scaled_height(w, h, target_width), FilterType::Lanczos3)
    }

    fn write_webp(img: &DynamicImage, quality: u8, out: &Path) -> Result<()> {
        let rgba = img.to_rgba8();
        let options = EncoderOptions {
            encoding_config: Some(EncodingConfig::new_lossy(quality as f32)),
            ..Default::default()
        };
        let mut encoder =
            Encoder::new_with_options(rgba.dimensions(), options).map_err(|e| image_error(out, format!("{:?}", e)))?;
        encoder
            .add_frame(rgba.as_raw(), 0)
            .map_err(|e| image_error(out, format!("{:?}", e)))?;
        let data = encoder
            .finalize(100)
            .map_err(|e| image_error(out, format!("{:?}", e)))?;
        std::fs::write(out, &*data)?;
        Ok(())
    }

    fn write_jpeg(img: &DynamicImage, quality: u8, out: &Path) -> Result<()> {
        let rgb = img.to_rgb8();
        let mut writer = BufWriter::new(File::create(out)?);
        JpegEncoder::new_with_quality(&mut writer, quality)
            .encode_image(&rgb)
            .map_err(|e| image_error(out, e))?;
        Ok(())
    }

    fn write_variant(img: &DynamicImage, variant: &Variant, out_dir: &Path) -> Result<PathBuf> {
        let out = out_dir.join(&variant.file_name);
        let resized = resize(img, variant.width);
        match variant.format {
            OutputFormat::WebP => write_webp(&resized, variant.quality, &out)?,
            OutputFormat::Jpeg => write_jpeg(&resized, variant.quality, &out)?,
        }
        Ok(out)
    }

    /// Decode `src` once and write every planned variant. Blocking.
    pub fn process_image(src: &Path, config: &OptimizeConfig) -> Result<Vec<PathBuf>> {
        let file_name = src.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
        log::info!("Processing {}...", file_name);

        let stem = file_stem(src)?;
        let img = image::open(src).map_err(|e| image_error(src, e))?;
        let plan = plan_variants(stem, config);
        let written = plan
            .iter()
            .map(|v| write_variant(&img, v, &config.out_dir))
            .collect::<Result<Vec<_>>>()?;

        let webp = plan.iter().filter(|v| v.format == OutputFormat::WebP).count();
        log::info!("  ✓ {}: {} WebP + 1 JPEG fallback", stem, webp);
        Ok(written)
    }
}

#[cfg(feature = "optimize")]
pub use encode::process_image;

/// Run the pipeline over `config.src_dir`. Sources are processed in
/// parallel, one blocking task per image with at most one per CPU in
/// flight. A failing source is recorded in the summary and does not stop
/// the others.
#[cfg(feature = "optimize")]
pub async fn optimize(config: &OptimizeConfig) -> Result<OptimizeSummary> {
    use futures::stream::{self, StreamExt};
    use std::sync::Arc;

    config.validate()?;
    std::fs::create_dir_all(&config.out_dir)?;
    let sources = find_sources(&config.src_dir)?;
    log::info!(
        "optimizing {} image(s) from {} into {}",
        sources.len(),
        config.src_dir.display(),
        config.out_dir.display()
    );

    let shared = Arc::new(config.clone());
    let mut results: Vec<(PathBuf, Result<Vec<PathBuf>>)> = stream::iter(sources)
        .map(|src| {
            let cfg = Arc::clone(&shared);
            async move {
                let task_src = src.clone();
                let res = tokio::task::spawn_blocking(move || process_image(&task_src, &cfg))
                    .await
                    .map_err(|e| Error::Other(format!("image worker failed: {}", e)))
                    .and_then(|r| r);
                (src, res)
            }
        })
        .buffer_unordered(num_cpus::get().max(1))
        .collect()
        .await;
    results.sort_by(|a, b| a.0.cmp(&b.0));

    let mut summary = OptimizeSummary::default();
    for (src, res) in results {
        match res {
            Ok(mut written) => {
                let name = src.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
                summary.processed.push(name);
                summary.written.append(&mut written);
            }
            Err(e) => {
                log::warn!("failed to process {}: {}", src.display(), e);
                summary.failures.push((src, e.to_string()));
            }
        }
    }
    log::info!("Done!");
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_extensions_ignore_case() {
        for name in ["a.jpg", "b.JPEG", "c.Png", "d.jpeg"] {
            assert!(is_source_image(Path::new(name)), "{}", name);
        }
        for name in ["a.gif", "b.webp", "jpg", "c.jpg.txt"] {
            assert!(!is_source_image(Path::new(name)), "{}", name);
        }
    }

    #[test]
    fn plan_lists_webp_widths_then_fallback() {
        let names: Vec<String> = plan_variants("blue-lungs", &OptimizeConfig::default())
            .into_iter()
            .map(|v| v.file_name)
            .collect();
        assert_eq!(
            names,
            [
                "blue-lungs-400w.webp",
                "blue-lungs-800w.webp",
                "blue-lungs-1200w.webp",
                "blue-lungs-1600w.webp",
                "blue-lungs-800w.jpg",
            ]
        );
    }

    #[test]
    fn scaled_height_rounds_and_clamps() {
        assert_eq!(scaled_height(1600, 1200, 400), 300);
        assert_eq!(scaled_height(3, 2, 400), 267);
        assert_eq!(scaled_height(4000, 1, 400), 1);
        // Upscaling keeps the ratio too.
        assert_eq!(scaled_height(200, 100, 800), 400);
    }

    #[test]
    fn validate_rejects_bad_settings() {
        let mut cfg = OptimizeConfig::default();
        assert!(cfg.validate().is_ok());
        cfg.webp_quality = 0;
        assert!(cfg.validate().is_err());
        cfg = OptimizeConfig { widths: vec![], ..Default::default() };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn find_sources_filters_and_sorts() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path();
        std::fs::create_dir_all(dir.join("nested.png")).unwrap();
        for name in ["b.PNG", "a.jpg", "notes.txt"] {
            std::fs::write(dir.join(name), b"x").unwrap();
        }
        let found: Vec<_> = find_sources(dir)
            .unwrap()
            .into_iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(found, ["a.jpg", "b.PNG"]);
    }
}

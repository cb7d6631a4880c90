use crate::error::{EtlError, Result, ResultExt};
use crate::quality::QualityReport;
use crate::types::{Order, OrderItem};
use polars::prelude::*;
use serde::Serialize;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;

/// Writes derived artifacts and reports into one output directory.
#[derive(Debug, Clone)]
pub struct ArtifactWriter {
    output_dir: PathBuf,
}

impl ArtifactWriter {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn orders_frame(orders: &[Order]) -> Result<DataFrame> {
        let frame = df![
            "order_id" => orders.iter().map(|o| o.order_id.clone()).collect::<Vec<_>>(),
            "customer_id" => orders.iter().map(|o| o.customer_id.clone()).collect::<Vec<_>>(),
            "order_date" => orders.iter().map(|o| o.order_date.clone()).collect::<Vec<_>>(),
            "total_amount" => orders.iter().map(|o| o.total_amount).collect::<Vec<_>>(),
            "status" => orders.iter().map(|o| o.status.clone()).collect::<Vec<_>>(),
        ]?;
        Ok(frame)
    }

    pub fn order_items_frame(items: &[OrderItem]) -> Result<DataFrame> {
        let frame = df![
            "order_item_id" => items.iter().map(|i| i.order_item_id).collect::<Vec<_>>(),
            "order_id" => items.iter().map(|i| i.order_id.clone()).collect::<Vec<_>>(),
            "product_id" => items.iter().map(|i| i.product_id.clone()).collect::<Vec<_>>(),
            "quantity" => items.iter().map(|i| i.quantity).collect::<Vec<_>>(),
            "unit_price" => items.iter().map(|i| i.unit_price).collect::<Vec<_>>(),
            "subtotal" => items.iter().map(|i| i.subtotal).collect::<Vec<_>>(),
        ]?;
        Ok(frame)
    }

    /// Write `orders` to `<output_dir>/<file_name>`.
    pub fn write_orders(&self, orders: &[Order], file_name: &str) -> Result<PathBuf> {
        let mut frame = Self::orders_frame(orders)?;
        self.write_csv(&mut frame, file_name)
    }

    /// Write `items` to `<output_dir>/<file_name>`.
    pub fn write_order_items(&self, items: &[OrderItem], file_name: &str) -> Result<PathBuf> {
        let mut frame = Self::order_items_frame(items)?;
        self.write_csv(&mut frame, file_name)
    }

    /// Write the text report and a `.json` twin with the same stem.
    pub fn write_quality_report(&self, report: &QualityReport, file_name: &str) -> Result<(PathBuf, PathBuf)> {
        let text_path = self.prepare(file_name)?;
        fs::write(&text_path, report.render_text())
            .map_err(|e| EtlError::ReportGenerationFailed(format!("{}: {}", text_path.display(), e)))?;
        info!("Report saved: {}", text_path.display());

        let json_path = text_path.with_extension("json");
        self.write_json_to(report, &json_path)?;
        Ok((text_path, json_path))
    }

    /// Serialize `value` as pretty JSON to `<output_dir>/<file_name>`.
    pub fn write_json<T: Serialize>(&self, value: &T, file_name: &str) -> Result<PathBuf> {
        let path = self.prepare(file_name)?;
        self.write_json_to(value, &path)?;
        Ok(path)
    }

    fn write_json_to<T: Serialize>(&self, value: &T, path: &Path) -> Result<()> {
        let mut file = File::create(path).context(format!("Failed to create {}", path.display()))?;
        file.write_all(serde_json::to_string_pretty(value)?.as_bytes())?;
        info!("Report saved: {}", path.display());
        Ok(())
    }

    fn write_csv(&self, frame: &mut DataFrame, file_name: &str) -> Result<PathBuf> {
        let path = self.prepare(file_name)?;
        let mut file = File::create(&path).map_err(|e| EtlError::ArtifactWriteFailed {
            artifact: file_name.to_string(),
            reason: e.to_string(),
        })?;

        CsvWriter::new(&mut file)
            .include_header(true)
            .with_separator(b',')
            .with_quote_char(b'"')
            .finish(frame)
            .map_err(|e| EtlError::ArtifactWriteFailed {
                artifact: file_name.to_string(),
                reason: e.to_string(),
            })?;

        info!("Artifact saved: {} ({} rows)", path.display(), frame.height());
        Ok(path)
    }

    fn prepare(&self, file_name: &str) -> Result<PathBuf> {
        fs::create_dir_all(&self.output_dir)
            .context(format!("Failed to create {}", self.output_dir.display()))?;
        Ok(self.output_dir.join(file_name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quality::SourceQuality;
    use tempfile::TempDir;

    fn order(id: &str, total: f64) -> Order {
        Order {
            order_id: id.to_string(),
            customer_id: "001".to_string(),
            order_date: None,
            total_amount: total,
            status: Some("Completed".to_string()),
        }
    }

    #[test]
    fn test_write_orders_replaces_file() {
        let dir = TempDir::new().unwrap();
        let writer = ArtifactWriter::new(dir.path().join("out"));

        writer
            .write_orders(&[order("1", 100.0), order("2", 20.0)], "orders.csv")
            .unwrap();
        let path = writer.write_orders(&[order("3", 5.0)], "orders.csv").unwrap();

        let content = fs::read_to_string(path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines[0], "order_id,customer_id,order_date,total_amount,status");
        assert_eq!(lines.len(), 2);
        assert!(lines[1].starts_with("3,001,,5"));
    }

    #[test]
    fn test_write_order_items_header_only_when_empty() {
        let dir = TempDir::new().unwrap();
        let writer = ArtifactWriter::new(dir.path());
        let path = writer.write_order_items(&[], "order_items.csv").unwrap();

        let content = fs::read_to_string(path).unwrap();
        assert_eq!(
            content.trim_end(),
            "order_item_id,order_id,product_id,quantity,unit_price,subtotal"
        );
    }

    #[test]
    fn test_write_quality_report_text_and_json() {
        let dir = TempDir::new().unwrap();
        let writer = ArtifactWriter::new(dir.path());
        let report = QualityReport {
            sources: vec![SourceQuality {
                file: "sales_raw.csv".to_string(),
                records_processed: 3,
                duplicates_removed: 1,
                missing_values: 0,
                records_loaded: 2,
            }],
        };

        let (text, json) = writer
            .write_quality_report(&report, "data_quality_report.txt")
            .unwrap();

        assert!(fs::read_to_string(text).unwrap().contains("- Duplicates Removed: 1"));
        let parsed: QualityReport = serde_json::from_str(&fs::read_to_string(json).unwrap()).unwrap();
        assert_eq!(parsed, report);
    }
}

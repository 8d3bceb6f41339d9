//! Transfer kinds and the per-transfer progress value

use crate::progress::presenter::ratio_percent;
use serde::Serialize;

/// Multipart endpoints that take a single `file` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TransferKind {
    #[serde(rename = "convert-excel-to-csv")]
    ConvertExcelToCsv,
    #[serde(rename = "upload-csv-to-db")]
    UploadCsvToDb,
}

impl TransferKind {
    pub fn endpoint(self) -> &'static str {
        match self {
            TransferKind::ConvertExcelToCsv => "convert-excel-to-csv",
            TransferKind::UploadCsvToDb => "upload-csv-to-db",
        }
    }

    pub fn accepted_extensions(self) -> &'static [&'static str] {
        match self {
            TransferKind::ConvertExcelToCsv => &["xlsx", "xls"],
            TransferKind::UploadCsvToDb => &["csv"],
        }
    }

    /// Extension check on the file name, case-insensitive.
    pub fn accepts(self, file_name: &str) -> bool {
        let Some((_, ext)) = file_name.rsplit_once('.') else {
            return false;
        };
        let ext = ext.to_ascii_lowercase();
        self.accepted_extensions().contains(&ext.as_str())
    }

    pub(crate) fn mime_type(self, file_name: &str) -> &'static str {
        match self {
            TransferKind::UploadCsvToDb => "text/csv",
            TransferKind::ConvertExcelToCsv => {
                if file_name.to_ascii_lowercase().ends_with(".xls") {
                    "application/vnd.ms-excel"
                } else {
                    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
                }
            }
        }
    }
}

impl std::fmt::Display for TransferKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.endpoint())
    }
}

/// Upload progress of the current transfer.
///
/// `percent` never decreases within one transfer and only reaches 100
/// through the byte ratio or `complete`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct TransferProgress {
    pub percent: u32,
    pub bytes_sent: u64,
    pub bytes_total: Option<u64>,
}

impl TransferProgress {
    pub fn started(bytes_total: Option<u64>) -> Self {
        Self {
            percent: 0,
            bytes_sent: 0,
            bytes_total,
        }
    }

    /// Apply one byte-count event. Returns whether anything visible changed.
    pub fn record(&mut self, bytes_sent: u64, bytes_total: Option<u64>) -> bool {
        let before = *self;
        if bytes_total.is_some() {
            self.bytes_total = bytes_total;
        }
        self.bytes_sent = self.bytes_sent.max(bytes_sent);
        if let Some(total) = self.bytes_total.filter(|total| *total > 0) {
            self.percent = self.percent.max(ratio_percent(self.bytes_sent, total));
        }
        *self != before
    }

    pub fn complete(&mut self) -> bool {
        let changed = self.percent != 100;
        self.percent = 100;
        changed
    }
}

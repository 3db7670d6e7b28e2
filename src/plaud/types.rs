// Plaud API wire types
//
// Every field carries a serde default: the API omits fields freely and a
// missing flag must not fail a whole page.

use serde::{Deserialize, Serialize};

use crate::database::RecordingUpsert;

/// Content item type holding the vendor's own transcript
pub const TRANSCRIPT_DATA_TYPE: &str = "transaction";

/// Body fields every Plaud response carries
pub trait Envelope {
    fn status(&self) -> i64;
    fn message(&self) -> &str;
}

macro_rules! impl_envelope {
    ($($ty:ty),+) => {
        $(impl Envelope for $ty {
            fn status(&self) -> i64 {
                self.status
            }

            fn message(&self) -> &str {
                &self.msg
            }
        })+
    };
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct PlaudDevice {
    pub sn: String,
    pub name: String,
    pub model: String,
    pub version_number: i64,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct DeviceListResponse {
    pub status: i64,
    pub msg: String,
    pub data_devices: Vec<PlaudDevice>,
}

/// One entry of the remote recording list
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct PlaudRecording {
    pub id: String,
    pub filename: String,
    pub keywords: Vec<String>,
    pub filesize: i64,
    pub filetype: String,
    pub fullname: String,
    pub file_md5: String,
    pub ori_ready: bool,
    pub version: i64,
    pub version_ms: i64,
    pub edit_time: i64,
    pub edit_from: String,
    pub is_trash: bool,
    /// Epoch milliseconds
    pub start_time: i64,
    pub end_time: i64,
    /// Milliseconds
    pub duration: i64,
    pub timezone: i64,
    pub zonemins: i64,
    pub scene: i64,
    pub filetag_id_list: Vec<String>,
    pub serial_number: String,
    pub is_trans: bool,
    pub is_summary: bool,
}

impl From<&PlaudRecording> for RecordingUpsert {
    fn from(remote: &PlaudRecording) -> Self {
        RecordingUpsert {
            remote_id: remote.id.clone(),
            device_sn: remote.serial_number.clone(),
            filename: remote.filename.clone(),
            file_md5: remote.file_md5.clone(),
            filesize: remote.filesize,
            filetype: remote.filetype.clone(),
            duration_ms: remote.duration,
            start_time_ms: remote.start_time,
            end_time_ms: remote.end_time,
            version: remote.version,
            version_ms: remote.version_ms,
            edit_time: remote.edit_time,
            is_trash: remote.is_trash,
            ori_ready: remote.ori_ready,
            is_trans: remote.is_trans,
            is_summary: remote.is_summary,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RecordingsResponse {
    pub status: i64,
    pub msg: String,
    pub data_file_total: i64,
    pub data_file_list: Vec<PlaudRecording>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct TempUrlResponse {
    pub status: i64,
    pub msg: String,
    pub temp_url: String,
    pub temp_url_opus: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct ContentItem {
    pub data_id: String,
    /// "transaction", "outline" or "auto_sum_note"
    pub data_type: String,
    pub task_status: i64,
    pub data_title: String,
    pub data_tab_name: String,
    pub data_link: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct PreDownloadContent {
    pub data_id: String,
    pub data_content: String,
}

/// Content manifest of a single recording
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct FileDetail {
    pub file_id: String,
    pub file_name: String,
    pub file_version: i64,
    pub duration: i64,
    pub is_trash: bool,
    pub start_time: i64,
    pub scene: i64,
    pub serial_number: String,
    pub content_list: Vec<ContentItem>,
    pub pre_download_content_list: Vec<PreDownloadContent>,
}

impl FileDetail {
    /// The vendor transcript entry, if the remote produced one
    pub fn transcript_item(&self) -> Option<&ContentItem> {
        self.content_list
            .iter()
            .find(|item| item.data_type == TRANSCRIPT_DATA_TYPE)
    }

    /// Inline content shipped with the detail response for a content item
    pub fn pre_downloaded(&self, data_id: &str) -> Option<&str> {
        self.pre_download_content_list
            .iter()
            .find(|c| c.data_id == data_id && !c.data_content.is_empty())
            .map(|c| c.data_content.as_str())
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct FileDetailResponse {
    pub status: i64,
    pub msg: String,
    pub data: FileDetail,
}

impl_envelope!(DeviceListResponse, RecordingsResponse, TempUrlResponse, FileDetailResponse);

/// One speaker turn of a vendor transcript
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct TranscriptSegment {
    pub content: String,
    pub start_time: i64,
    pub end_time: i64,
    pub speaker: String,
}

/// Flatten vendor transcript content into plain text.
///
/// The content is normally a JSON array of speaker segments, rendered one
/// turn per line. Anything else is taken as already-plain text.
pub fn transcript_text(raw: &str) -> Option<String> {
    let text = match serde_json::from_str::<Vec<TranscriptSegment>>(raw) {
        Ok(segments) => segments
            .iter()
            .filter(|s| !s.content.trim().is_empty())
            .map(|s| {
                if s.speaker.is_empty() {
                    s.content.trim().to_string()
                } else {
                    format!("{}: {}", s.speaker, s.content.trim())
                }
            })
            .collect::<Vec<_>>()
            .join("\n"),
        Err(_) => raw.trim().to_string(),
    };

    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

/// Opaque pagination position (skip offset into the remote list)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct Cursor(u64);

impl Cursor {
    pub fn start() -> Self {
        Cursor(0)
    }

    pub fn offset(&self) -> u64 {
        self.0
    }

    pub(crate) fn advanced_by(&self, n: usize) -> Self {
        Cursor(self.0 + n as u64)
    }
}

/// One page of the remote recording list
#[derive(Debug, Clone, Default)]
pub struct RecordingPage {
    pub items: Vec<PlaudRecording>,
    /// None once the list is exhausted
    pub next_cursor: Option<Cursor>,
}

//! Success summary printed to stdout.

use imgup_core::UploadReceipt;
use imgup_core::present::pretty_json;

/// Renders the summary of a successful upload.
pub fn render_receipt(receipt: &UploadReceipt) -> String {
    format!(
        "upload succeeded\nkey: {}\nhost: {}\nresponse_json:\n{}",
        receipt.key,
        receipt.host,
        pretty_json(&receipt.response)
    )
}

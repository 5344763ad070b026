// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Async IPP client for a CUPS print spooler.
//
// Uses the `ipp` crate's async API to send:
//   - CUPS-Get-Printers       (CUPS IPP extension)
//   - Print-Job               (RFC 8011 §4.2.1)
//
// Printer queues live under `<server>/printers/<name>`.

use std::io::Cursor;

use ipp::prelude::*;
use tracing::{debug, error, info, instrument};

use spoolgate_core::PrintOptions;
use spoolgate_core::error::{DispatchError, Result};

/// Async IPP client bound to one CUPS server.
pub struct IppClient {
    /// The CUPS server URI (ipp:// or ipps://), without a resource path.
    server: String,
    /// Parsed form of `server`.
    uri: Uri,
}

impl IppClient {
    /// Create a new client targeting the given CUPS server URI, e.g.
    /// `ipp://localhost:631`.
    pub fn new(uri: &str) -> Result<Self> {
        let server = uri.trim_end_matches('/').to_string();
        let parsed: Uri = server
            .parse()
            .map_err(|e| DispatchError::Config(format!("invalid CUPS URI '{uri}': {e}")))?;
        Ok(Self {
            server,
            uri: parsed,
        })
    }

    /// URI of the named printer queue on this server.
    pub fn printer_uri(&self, printer_name: &str) -> Result<Uri> {
        let raw = format!("{}/printers/{}", self.server, printer_name);
        raw.parse().map_err(|e| {
            DispatchError::Submission(format!("invalid printer URI '{raw}': {e}"))
        })
    }

    /// List the names of all printers the spooler currently knows.
    #[instrument(skip(self), fields(uri = %self.uri))]
    pub async fn get_printers(&self) -> Result<Vec<String>> {
        let operation = IppOperationBuilder::cups().get_printers();
        let client = AsyncIppClient::new(self.uri.clone());

        debug!("sending CUPS-Get-Printers");
        let response = client
            .send(operation)
            .await
            .map_err(|e| DispatchError::Submission(format!("CUPS-Get-Printers: {e}")))?;

        if !response.header().status_code().is_success() {
            let code = response.header().status_code();
            error!(status = ?code, "CUPS-Get-Printers failed");
            return Err(DispatchError::Submission(format!(
                "CUPS-Get-Printers returned status {code:?}"
            )));
        }

        let names = printer_names(response.attributes());
        debug!(count = names.len(), "received printer list");
        Ok(names)
    }

    /// Submit a document to the named printer as a Print-Job.
    ///
    /// Returns the job-id assigned by the spooler as soon as the job is
    /// accepted; completion is not tracked.
    #[instrument(skip(self, document_bytes, options), fields(uri = %self.uri, printer = %printer_name, job_name = %job_name))]
    pub async fn print_job(
        &self,
        printer_name: &str,
        document_bytes: Vec<u8>,
        document_format: &str,
        job_name: &str,
        options: &PrintOptions,
    ) -> Result<i32> {
        let printer_uri = self.printer_uri(printer_name)?;
        let payload = IppPayload::new(Cursor::new(document_bytes));

        let mut builder = IppOperationBuilder::print_job(printer_uri.clone(), payload)
            .job_title(job_name)
            .document_format(document_format);
        for attribute in job_attributes(options)? {
            builder = builder.attribute(attribute);
        }
        let operation = builder.build();

        let client = AsyncIppClient::new(printer_uri);

        info!(mime = document_format, "sending Print-Job");
        let response = client
            .send(operation)
            .await
            .map_err(|e| DispatchError::Submission(format!("Print-Job: {e}")))?;

        if !response.header().status_code().is_success() {
            let code = response.header().status_code();
            error!(status = ?code, "Print-Job failed");
            return Err(DispatchError::Submission(format!(
                "Print-Job returned status {code:?}"
            )));
        }

        // The job-id is in the Job Attributes group.
        let job_id = extract_job_id(response.attributes()).ok_or_else(|| {
            DispatchError::Submission("Print-Job response missing job-id attribute".into())
        })?;

        info!(job_id, "print job accepted by spooler");
        Ok(job_id)
    }
}

// ---------------------------------------------------------------------------
// Helper functions for building requests and parsing IPP responses
// ---------------------------------------------------------------------------

/// Translate print options into Print-Job job attributes.
///
/// `ColorModel` is a CUPS/PPD option rather than a registered IPP attribute,
/// so it travels as a name value, which CUPS maps onto the PPD option. An
/// integer option that does not fit an IPP integer fails the submission.
fn job_attributes(options: &PrintOptions) -> Result<Vec<IppAttribute>> {
    options
        .as_pairs()
        .into_iter()
        .map(|(name, value)| {
            let ipp_value = match name {
                "copies" => IppValue::Integer(ipp_integer(name, &value)?),
                "orientation-requested" => IppValue::Enum(ipp_integer(name, &value)?),
                "sides" => IppValue::Keyword(value.into()),
                _ => IppValue::NameWithoutLanguage(value.into()),
            };
            Ok(IppAttribute::new(name, ipp_value))
        })
        .collect()
}

fn ipp_integer(name: &str, value: &str) -> Result<i32> {
    value.parse::<i32>().map_err(|e| {
        DispatchError::Submission(format!("{name} value '{value}' is not an IPP integer: {e}"))
    })
}

/// Extract the `job-id` integer from a response's Job Attributes group.
fn extract_job_id(attrs: &IppAttributes) -> Option<i32> {
    for group in attrs.groups_of(DelimiterTag::JobAttributes) {
        if let Some(attr) = group.attributes().get("job-id")
            && let IppValue::Integer(id) = attr.value()
        {
            return Some(*id);
        }
    }
    None
}

/// Collect `printer-name` from every Printer Attributes group.
fn printer_names(attrs: &IppAttributes) -> Vec<String> {
    attrs
        .groups_of(DelimiterTag::PrinterAttributes)
        .filter_map(|group| {
            group
                .attributes()
                .get("printer-name")
                .map(|a| format!("{}", a.value()))
        })
        .collect()
}

/// IPP `document-format` for a file, by extension. Unknown types are left to
/// the spooler's auto-typing.
pub fn document_format_for(path: &std::path::Path) -> &'static str {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .as_deref()
    {
        Some("pdf") => "application/pdf",
        Some("ps") => "application/postscript",
        Some("txt") => "text/plain",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("png") => "image/png",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use spoolgate_core::{DocumentSource, JobRequest, Orientation};
    use std::path::{Path, PathBuf};

    fn options(orientation: Orientation) -> PrintOptions {
        let request = JobRequest::new(
            DocumentSource::Local(PathBuf::from("/tmp/a.pdf")),
            "Office",
            3,
            true,
            true,
            orientation,
        )
        .unwrap();
        PrintOptions::from_request(&request)
    }

    #[test]
    fn new_rejects_invalid_uri() {
        let result = IppClient::new("not a valid uri %%%");
        assert!(result.is_err());
    }

    #[test]
    fn printer_uri_appends_queue_path() {
        let client = IppClient::new("ipp://localhost:631/").unwrap();
        let uri = client.printer_uri("HP_LaserJet_Professional_M1136_MFP").unwrap();
        assert_eq!(
            uri.to_string(),
            "ipp://localhost:631/printers/HP_LaserJet_Professional_M1136_MFP"
        );
    }

    #[test]
    fn job_attributes_use_ipp_types() {
        let attrs = job_attributes(&options(Orientation::Landscape)).unwrap();
        let find = |name: &str| {
            attrs
                .iter()
                .find(|a| a.name() == name)
                .map(|a| a.value().clone())
        };

        assert_eq!(find("copies"), Some(IppValue::Integer(3)));
        assert_eq!(
            find("sides"),
            Some(IppValue::Keyword("two-sided-long-edge".into()))
        );
        assert_eq!(
            find("ColorModel"),
            Some(IppValue::NameWithoutLanguage("Color".into()))
        );
        assert_eq!(find("orientation-requested"), Some(IppValue::Enum(4)));
    }

    #[test]
    fn portrait_jobs_send_no_orientation() {
        let attrs = job_attributes(&options(Orientation::Portrait)).unwrap();
        assert!(attrs.iter().all(|a| a.name() != "orientation-requested"));
        assert_eq!(attrs.len(), 3);
    }

    #[test]
    fn out_of_range_copies_fail_instead_of_defaulting() {
        let mut opts = options(Orientation::Portrait);
        opts.copies = "3000000000".into();

        let result = job_attributes(&opts);
        assert!(
            matches!(result, Err(DispatchError::Submission(msg)) if msg.contains("copies"))
        );
    }

    #[test]
    fn document_format_follows_extension() {
        assert_eq!(document_format_for(Path::new("/tmp/x.PDF")), "application/pdf");
        assert_eq!(
            document_format_for(Path::new("/tmp/spoolgate-abc")),
            "application/octet-stream"
        );
    }
}

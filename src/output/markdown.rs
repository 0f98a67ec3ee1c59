//! Markdown catalogue export
//!
//! Renders the stored services, with their sections and forms, as one
//! human-readable markdown document.

use crate::config::SectionLabels;
use crate::output::{OutputError, OutputResult};
use crate::record::Service;
use crate::storage::ServiceCatalog;
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Services loaded per catalogue query
const EXPORT_PAGE_SIZE: u64 = 500;

/// Writes every stored service to a markdown file
///
/// # Arguments
///
/// * `catalog` - The storage to read services from
/// * `labels` - Section headings to use in the document
/// * `output_path` - Path where the markdown file should be written
///
/// # Returns
///
/// * `Ok(usize)` - Number of services written
/// * `Err(OutputError)` - Failed to read services or write the file
pub fn export_catalogue(
    catalog: &dyn ServiceCatalog,
    labels: &SectionLabels,
    output_path: &Path,
) -> OutputResult<usize> {
    let mut services = Vec::new();
    let mut offset = 0;

    loop {
        let page = catalog
            .list_services(offset, EXPORT_PAGE_SIZE)
            .map_err(|e| OutputError::Storage(e.to_string()))?;
        let fetched = page.len() as u64;
        services.extend(page);

        if fetched < EXPORT_PAGE_SIZE {
            break;
        }
        offset += fetched;
    }

    let markdown = format_catalogue(&services, labels);

    let mut file = File::create(output_path)?;
    file.write_all(markdown.as_bytes())?;

    Ok(services.len())
}

/// Formats services as a markdown catalogue
///
/// Empty sections are left out; the fees line is always present.
pub fn format_catalogue(services: &[Service], labels: &SectionLabels) -> String {
    let mut md = String::new();

    md.push_str("# Service Catalogue\n\n");
    md.push_str(&format!(
        "- **Generated**: {}\n",
        chrono::Utc::now().to_rfc3339()
    ));
    md.push_str(&format!("- **Services**: {}\n", services.len()));
    md.push_str(&format!(
        "- **Forms**: {}\n\n",
        services.iter().map(|s| s.forms.len()).sum::<usize>()
    ));

    for service in services {
        format_service(&mut md, service, labels);
    }

    md
}

fn format_service(md: &mut String, service: &Service, labels: &SectionLabels) {
    md.push_str(&format!("## {}\n\n", service.title));
    md.push_str(&format!("- **Source**: {}\n", service.source_url));
    if let Some(digital) = service.is_digital_service {
        md.push_str(&format!(
            "- **Digital service**: {}\n",
            if digital { "yes" } else { "no" }
        ));
    }
    if let Some(office) = &service.responsible_office {
        md.push_str(&format!("- **Responsible office**: {}\n", office));
    }
    md.push('\n');

    push_section(md, &labels.prerequisites, &service.prerequisites);
    push_section(md, &labels.required_documents, &service.required_documents);
    push_section(md, &labels.fees, &service.fees);
    push_section(md, &labels.legal_basis, &service.legal_basis);

    if !service.forms.is_empty() {
        md.push_str(&format!("### {}\n\n", labels.forms));
        for form in &service.forms {
            md.push_str(&format!("- [{}]({})\n", form.title, form.url));
        }
        md.push('\n');
    }
}

fn push_section(md: &mut String, heading: &str, text: &str) {
    if text.is_empty() {
        return;
    }
    md.push_str(&format!("### {}\n\n{}\n\n", heading, text));
}

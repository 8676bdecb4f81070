//! Metadata file I/O adapter
//!
//! Loads an XML document into the metadata tree and writes an edited
//! tree back out by rendering the template that generated the form.
//! Both directions first strip non-ASCII bytes from the source file
//! in place; upstream producers are known to emit stray bytes that
//! break parsing.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::error::{LoadError, SaveError};
use crate::metadata::{xml, MetaValue};
use crate::template::render;

/// Output name used when the caller does not provide one.
pub const DEFAULT_EXPORT_NAME: &str = "RANDExportMD";

/// Remove non-ASCII bytes from a file in place and return the
/// cleaned text.
pub fn strip_non_ascii_in_place(path: &Path) -> io::Result<String> {
    let bytes = fs::read(path)?;
    let cleaned: Vec<u8> = bytes.into_iter().filter(u8::is_ascii).collect();
    fs::write(path, &cleaned)?;
    // Pure ASCII at this point, so the conversion is lossless.
    Ok(String::from_utf8_lossy(&cleaned).into_owned())
}

/// Initialize the metadata tree: empty without a path, otherwise the
/// cleaned and parsed document.
pub fn init_md(path: Option<&Path>) -> Result<MetaValue, LoadError> {
    let Some(path) = path else {
        return Ok(MetaValue::empty_object());
    };
    let text = strip_non_ascii_in_place(path).map_err(|source| LoadError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    xml::parse_document(&text).map_err(|message| LoadError::Parse {
        path: path.to_path_buf(),
        message,
    })
}

/// Render the template against `md` and write the result.
///
/// `ows_tag_list` is the positional literal-override list produced by
/// the template-definition mode. The output name defaults and gets an
/// `.xml` suffix appended when missing; `remove_template` deletes the
/// (one-shot, rewritten) template after a successful write.
pub fn save_to_xml(
    md: &MetaValue,
    ows_tag_list: Option<&[String]>,
    template_path: &Path,
    out_dir: Option<&Path>,
    out_name: Option<&str>,
    remove_template: bool,
) -> Result<PathBuf, SaveError> {
    let mut name = out_name
        .filter(|n| !n.is_empty())
        .unwrap_or(DEFAULT_EXPORT_NAME)
        .to_string();
    if !name.to_lowercase().ends_with(".xml") {
        name.push_str(".xml");
    }

    let dir = match out_dir {
        Some(dir) => dir.to_path_buf(),
        None => template_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from(".")),
    };
    let out_path = dir.join(name);

    let template_text =
        strip_non_ascii_in_place(template_path).map_err(|source| SaveError::TemplateRead {
            path: template_path.to_path_buf(),
            source,
        })?;

    let rendered = render::render(&template_text, md, ows_tag_list).map_err(SaveError::Render)?;

    fs::write(&out_path, rendered).map_err(|source| SaveError::Write {
        path: out_path.clone(),
        source,
    })?;
    tracing::info!("metadata exported to {}", out_path.display());

    if remove_template {
        if let Err(err) = fs::remove_file(template_path) {
            tracing::warn!(
                "cannot remove one-shot template {}: {err}",
                template_path.display()
            );
        }
    }

    Ok(out_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn scratch_dir(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("mdedit-io-{tag}-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn segs(path: &str) -> Vec<String> {
        path.split('.').map(str::to_string).collect()
    }

    #[test]
    fn test_init_md_without_path_is_empty() {
        let md = init_md(None).unwrap();
        assert_eq!(md, MetaValue::empty_object());
    }

    #[test]
    fn test_init_md_strips_non_ascii_in_place() {
        let dir = scratch_dir("strip");
        let path = dir.join("doc.xml");
        fs::write(&path, b"<md><title>caf\xc3\xa9</title></md>").unwrap();

        let md = init_md(Some(&path)).unwrap();
        assert_eq!(md.get_path(&segs("title")), Some(&MetaValue::scalar("caf")));

        let on_disk = fs::read(&path).unwrap();
        assert!(on_disk.iter().all(u8::is_ascii), "file cleaned in place");
    }

    #[test]
    fn test_init_md_parse_failure_is_load_error() {
        let dir = scratch_dir("bad");
        let path = dir.join("broken.xml");
        fs::write(&path, "<md><open></md>").unwrap();
        assert!(matches!(
            init_md(Some(&path)),
            Err(LoadError::Parse { .. })
        ));
    }

    #[test]
    fn test_save_defaults_name_and_appends_suffix() {
        let dir = scratch_dir("save");
        let template = dir.join("t.xml");
        fs::write(&template, "<t>{{ md.title }}</t>\n").unwrap();

        let mut md = MetaValue::empty_object();
        md.set_path(&segs("title"), MetaValue::scalar("T"));

        let out = save_to_xml(&md, None, &template, Some(&dir), None, false).unwrap();
        assert_eq!(out.file_name().unwrap(), format!("{DEFAULT_EXPORT_NAME}.xml").as_str());
        assert_eq!(fs::read_to_string(&out).unwrap(), "<t>T</t>\n");

        let named = save_to_xml(&md, None, &template, Some(&dir), Some("lakes"), false).unwrap();
        assert_eq!(named.file_name().unwrap(), "lakes.xml");
    }

    #[test]
    fn test_save_can_remove_one_shot_template() {
        let dir = scratch_dir("rm");
        let template = dir.join("EXPTt.xml");
        fs::write(&template, "<t/>\n").unwrap();
        let md = MetaValue::empty_object();
        save_to_xml(&md, None, &template, Some(&dir), Some("out"), true).unwrap();
        assert!(!template.exists());
    }
}

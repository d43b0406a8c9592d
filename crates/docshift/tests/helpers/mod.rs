//! Shared helpers for integration tests: in-memory PDFs and stand-ins for external tools.

#![allow(dead_code)]

use std::path::{Path, PathBuf};

use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, Stream};

/// PDF with one page per label; each page shows its label as text.
pub fn build_pdf(labels: &[&str]) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(Dictionary::from_iter([
        ("Type", Object::Name(b"Font".to_vec())),
        ("Subtype", Object::Name(b"Type1".to_vec())),
        ("BaseFont", Object::Name(b"Helvetica".to_vec())),
    ]));
    let resources_id = doc.add_object(Dictionary::from_iter([(
        "Font",
        Object::Dictionary(Dictionary::from_iter([("F1", Object::Reference(font_id))])),
    )]));

    let mut kids = Vec::new();
    for label in labels {
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 18.into()]),
                Operation::new("Td", vec![72.into(), 720.into()]),
                Operation::new("Tj", vec![Object::string_literal(*label)]),
                Operation::new("ET", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(Dictionary::new(), content.encode().unwrap()));
        let page_id = doc.add_object(Dictionary::from_iter([
            ("Type", Object::Name(b"Page".to_vec())),
            ("Parent", Object::Reference(pages_id)),
            ("Contents", Object::Reference(content_id)),
        ]));
        kids.push(Object::Reference(page_id));
    }

    doc.objects.insert(
        pages_id,
        Object::Dictionary(Dictionary::from_iter([
            ("Type", Object::Name(b"Pages".to_vec())),
            ("Count", Object::Integer(kids.len() as i64)),
            ("Kids", Object::Array(kids)),
            ("Resources", Object::Reference(resources_id)),
            (
                "MediaBox",
                Object::Array(vec![0.into(), 0.into(), 612.into(), 792.into()]),
            ),
        ])),
    );
    let catalog_id = doc.add_object(Dictionary::from_iter([
        ("Type", Object::Name(b"Catalog".to_vec())),
        ("Pages", Object::Reference(pages_id)),
    ]));
    doc.trailer.set("Root", Object::Reference(catalog_id));

    let mut output = Vec::new();
    doc.save_to(&mut output).unwrap();
    output
}

pub fn write_pdf(dir: &Path, name: &str, labels: &[&str]) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, build_pdf(labels)).unwrap();
    path
}

pub fn page_count(pdf: &[u8]) -> usize {
    Document::load_mem(pdf).unwrap().get_pages().len()
}

/// Text of every page, in order.
pub fn page_texts(pdf: &[u8]) -> Vec<String> {
    let doc = Document::load_mem(pdf).unwrap();
    doc.get_pages()
        .keys()
        .map(|&number| doc.extract_text(&[number]).unwrap().trim().to_string())
        .collect()
}

/// Minimal bytes that pass the DOCX upload check (zip signature).
pub fn docx_bytes() -> Vec<u8> {
    let mut bytes = b"PK\x03\x04".to_vec();
    bytes.extend_from_slice(b"word/document.xml");
    bytes
}

/// PNG signature followed by `payload`. The fake tesseract "recognises" the payload.
pub fn image_bytes(payload: &str) -> Vec<u8> {
    let mut bytes = vec![0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
    bytes.extend_from_slice(payload.as_bytes());
    bytes
}

/// Behaviour of the fake `soffice`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FakeOffice {
    /// Every conversion writes `<outdir>/<input stem>.<target ext>`
    Converts,
    /// Conversions that force the PDF import filter straight to DOCX fail; everything else works
    OnlyViaOdt,
    /// Like `OnlyViaOdt`, but the failing direct conversion leaves a partial DOCX behind
    PartialThenViaOdt,
    /// Conversions exit 0 without writing anything
    NoOutput,
    /// Conversions exit 1 with a message on stderr
    Fails,
    /// Conversions never finish
    Hangs,
    /// `--version` fails, so the tool counts as unavailable
    Broken,
}

#[cfg(unix)]
fn write_script(path: &Path, body: &str) {
    use std::os::unix::fs::PermissionsExt;

    std::fs::write(path, body).unwrap();
    let mut permissions = std::fs::metadata(path).unwrap().permissions();
    permissions.set_mode(0o755);
    std::fs::set_permissions(path, permissions).unwrap();
}

/// Write a fake `soffice` into `dir`. Every invocation is appended to `dir/soffice-calls.log`.
#[cfg(unix)]
pub fn fake_soffice(dir: &Path, behaviour: FakeOffice) -> PathBuf {
    let path = dir.join("soffice");
    let log = dir.join("soffice-calls.log");

    let version = match behaviour {
        FakeOffice::Broken => "echo 'soffice: cannot open display' >&2\n  exit 1",
        _ => "echo 'LibreOffice 7.6.4.1 40(Build:1)'\n  exit 0",
    };

    let convert = match behaviour {
        FakeOffice::Converts => "produce",
        FakeOffice::OnlyViaOdt => {
            "if [ -n \"$infilter\" ] && [ \"$ext\" = docx ]; then\n  \
             echo 'Error: source file could not be loaded' >&2\n  exit 1\nfi\nproduce"
        }
        FakeOffice::PartialThenViaOdt => {
            "if [ -n \"$infilter\" ] && [ \"$ext\" = docx ]; then\n  \
             printf 'partial' > \"$outdir/$stem.docx\"\n  \
             echo 'Error: source file could not be loaded' >&2\n  exit 1\nfi\nproduce"
        }
        FakeOffice::NoOutput => "echo \"convert $input -> $outdir using filter : $convert\"",
        FakeOffice::Fails => "echo 'Error: general input/output error' >&2\nexit 1",
        FakeOffice::Hangs => "exec sleep 30",
        FakeOffice::Broken => "exit 1",
    };

    let script = format!(
        r#"#!/bin/sh
echo "$@" >> '{log}'
if [ "$1" = "--version" ]; then
  {version}
fi
outdir=""
convert=""
infilter=""
input=""
while [ $# -gt 0 ]; do
  case "$1" in
    --outdir) outdir="$2"; shift 2 ;;
    --convert-to) convert="$2"; shift 2 ;;
    --infilter=*) infilter="${{1#--infilter=}}"; shift ;;
    -*) shift ;;
    *) input="$1"; shift ;;
  esac
done
ext="${{convert%%:*}}"
base=$(basename "$input")
stem="${{base%.*}}"
produce() {{
  printf 'converted %s to %s\n' "$base" "$ext" > "$outdir/$stem.$ext"
  echo "convert $input -> $outdir/$stem.$ext using filter : $convert"
}}
{convert}
"#,
        log = log.display(),
        version = version,
        convert = convert,
    );

    write_script(&path, &script);
    path
}

/// Write a fake `tesseract` into `dir`. It prints the image payload after the PNG signature,
/// fails for payloads containing `FAIL`, and logs every image to `dir/tesseract-calls.log`.
#[cfg(unix)]
pub fn fake_tesseract(dir: &Path) -> PathBuf {
    let path = dir.join("tesseract");
    let log = dir.join("tesseract-calls.log");

    let script = format!(
        r#"#!/bin/sh
if [ "$1" = "--version" ]; then
  echo 'tesseract 5.3.0'
  exit 0
fi
echo "$1" >> '{log}'
if grep -q FAIL "$1"; then
  echo 'Error in pixReadStream: Unknown format: no pix returned' >&2
  exit 1
fi
tail -c +9 "$1"
printf '\n\f'
"#,
        log = log.display(),
    );

    write_script(&path, &script);
    path
}

/// Lines of a fake tool's call log, empty when it was never called.
pub fn calls(dir: &Path, tool: &str) -> Vec<String> {
    std::fs::read_to_string(dir.join(format!("{}-calls.log", tool)))
        .map(|log| log.lines().map(str::to_string).collect())
        .unwrap_or_default()
}

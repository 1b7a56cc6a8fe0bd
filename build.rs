use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

// Stages the bundled pages (block page and friends) into OUT_DIR/ui so the
// binary can embed them. Release builds get minified HTML.
fn main() -> io::Result<()> {
    println!("cargo:rerun-if-changed=ui/");

    let out_dir = PathBuf::from(env::var("OUT_DIR").expect("OUT_DIR is set by cargo"));
    let staged = out_dir.join("ui");
    if staged.exists() {
        fs::remove_dir_all(&staged)?;
    }
    fs::create_dir_all(&staged)?;

    let minify = env::var("PROFILE").map(|p| p == "release").unwrap_or(false);
    let source = Path::new("ui");
    if !source.exists() {
        return Ok(());
    }

    for entry in fs::read_dir(source)? {
        let path = entry?.path();
        let Some(name) = path.file_name() else {
            continue;
        };
        if path.is_file() {
            stage_page(&path, &staged.join(name), minify)?;
        }
    }
    Ok(())
}

fn stage_page(from: &Path, to: &Path, minify: bool) -> io::Result<()> {
    let is_html = from.extension().is_some_and(|e| e == "html");
    if !(minify && is_html) {
        fs::copy(from, to)?;
        return Ok(());
    }

    let mut cfg = minify_html::Cfg::new();
    cfg.minify_css = true;
    cfg.keep_comments = false;
    fs::write(to, minify_html::minify(&fs::read(from)?, &cfg))
}

// Copies the static site shell to `dist/`; `wasm-pack build --target web
// --out-dir dist/pkg` fills in the module next to it.
use std::path::Path;

use fs_extra::dir::{copy, CopyOptions};

fn main() {
    println!("cargo:rerun-if-changed=static");

    let static_dir = Path::new("static");
    let out_dir = Path::new("dist");
    if !static_dir.exists() {
        return;
    }
    if let Err(err) = std::fs::create_dir_all(out_dir) {
        println!("cargo:warning=could not create dist/: {err}");
        return;
    }
    let options = CopyOptions::new().overwrite(true).content_only(true);
    if let Err(err) = copy(static_dir, out_dir, &options) {
        println!("cargo:warning=could not copy static/ to dist/: {err}");
    }
}

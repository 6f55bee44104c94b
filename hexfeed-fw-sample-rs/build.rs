// Copyright (c) 2026 ADNT Sarl <info@adnt.io>
// SPDX-License-Identifier: MIT

//! Links the sample application at the application base.

use std::env;
use std::fs;
use std::path::PathBuf;

const MEMORY_LAYOUT: &str = "fw_rp2040.x";

fn main() {
    let out_dir = PathBuf::from(env::var("OUT_DIR").unwrap());
    let script = PathBuf::from(env::var("CARGO_MANIFEST_DIR").unwrap())
        .join("../linker_scripts")
        .join(MEMORY_LAYOUT);

    // cortex-m-rt's link.x includes memory.x from the search path.
    let layout = fs::read_to_string(&script)
        .unwrap_or_else(|e| panic!("hexfeed sample: cannot read {}: {}", script.display(), e));
    fs::write(out_dir.join("memory.x"), layout).expect("hexfeed sample: cannot write memory.x");

    println!("cargo:rustc-link-search={}", out_dir.display());
    for arg in ["-Tlink.x", "-Tdefmt.x"] {
        println!("cargo:rustc-link-arg={}", arg);
    }
    println!("cargo:rerun-if-changed={}", script.display());
    println!("cargo:rerun-if-changed=build.rs");
}

//! Build script for torchscript-rs.
//!
//! Builds the C++ TorchScript bridge library and links it to the Rust crate.
//! PyTorch/libtorch is required for building.
//!
//! # Environment Variables
//!
//! - `LIBTORCH`: Path to libtorch installation (optional, auto-detected from Python if not set)
//! - `LIBTORCH_CXX11_ABI`: Set to "1" to use the CXX11 ABI (default: "1")
//! - `TS_BRIDGE_SKIP_BUILD`: Set to "1" to skip building (for development)

use std::env;
use std::path::PathBuf;
use std::process::Command;

/// Detect libtorch from the current Python environment.
///
/// Tries multiple Python executables in order:
/// 1. `.venv` in the repo root
/// 2. `python3` - system Python 3
/// 3. `python` - fallback
///
/// Returns (torch_path, python_executable) on success.
fn detect_libtorch_from_python() -> Option<(PathBuf, PathBuf)> {
    let manifest_dir = PathBuf::from(env::var("CARGO_MANIFEST_DIR").unwrap());

    let python_candidates = [
        manifest_dir.join(".venv/bin/python"),
        PathBuf::from("python3"),
        PathBuf::from("python"),
    ];

    for python in &python_candidates {
        let output = Command::new(python)
            .args(["-c", "import torch; print(torch.__path__[0])"])
            .output();

        if let Ok(output) = output {
            if output.status.success() {
                if let Ok(stdout) = String::from_utf8(output.stdout) {
                    let torch_path = PathBuf::from(stdout.trim());
                    // Verify it has the cmake config we need
                    if torch_path
                        .join("share/cmake/Torch/TorchConfig.cmake")
                        .exists()
                    {
                        return Some((torch_path, python.clone()));
                    }
                }
            }
        }
    }
    None
}

/// Query PyTorch version from Python and emit as cargo env var.
fn emit_libtorch_version(python: &PathBuf) {
    let output = Command::new(python)
        .args(["-c", "import torch; print(torch.__version__)"])
        .output();

    if let Ok(output) = output {
        if output.status.success() {
            if let Ok(stdout) = String::from_utf8(output.stdout) {
                let version = stdout.trim();
                if !version.is_empty() {
                    println!("cargo:rustc-env=LIBTORCH_VERSION={}", version);
                }
            }
        }
    }
}

fn main() {
    build_ts_bridge();
}

fn build_ts_bridge() {
    // Check if we should skip the build
    if env::var("TS_BRIDGE_SKIP_BUILD")
        .map(|v| v == "1")
        .unwrap_or(false)
    {
        println!("cargo:warning=Skipping ts-bridge build (TS_BRIDGE_SKIP_BUILD=1)");
        return;
    }

    // Get libtorch path: try LIBTORCH env var first, then auto-detect from Python
    let (libtorch, python) = if let Ok(path) = env::var("LIBTORCH") {
        // When LIBTORCH is set manually, still try to find Python for version info
        let manifest_dir = PathBuf::from(env::var("CARGO_MANIFEST_DIR").unwrap());
        let python = [
            manifest_dir.join(".venv/bin/python"),
            PathBuf::from("python3"),
            PathBuf::from("python"),
        ]
        .into_iter()
        .find(|p| Command::new(p).arg("--version").output().is_ok());
        (PathBuf::from(path), python)
    } else if let Some((path, python)) = detect_libtorch_from_python() {
        eprintln!("info: Auto-detected PyTorch from Python: {}", path.display());
        (path, Some(python))
    } else {
        panic!(
            "Could not find PyTorch installation.\n\
             Checked: .venv, python3, python\n\
             \n\
             To fix, either:\n\
             1. Create a venv with PyTorch: python -m venv .venv && .venv/bin/pip install torch\n\
             2. Set LIBTORCH environment variable to your PyTorch installation"
        );
    };

    // Emit libtorch version for info output
    if let Some(ref python) = python {
        emit_libtorch_version(python);
    }

    if !libtorch.exists() {
        panic!(
            "Libtorch path does not exist: {}\n\
             The LIBTORCH environment variable points to a non-existent path.",
            libtorch.display()
        );
    }

    // Rerun if bridge sources change
    println!("cargo:rerun-if-changed=bridge/src/ts_bridge.cpp");
    println!("cargo:rerun-if-changed=bridge/include/ts_bridge.h");
    println!("cargo:rerun-if-changed=bridge/CMakeLists.txt");
    println!("cargo:rerun-if-env-changed=LIBTORCH");
    println!("cargo:rerun-if-env-changed=LIBTORCH_CXX11_ABI");
    println!("cargo:rerun-if-env-changed=TS_BRIDGE_SKIP_BUILD");

    let manifest_dir = PathBuf::from(env::var("CARGO_MANIFEST_DIR").unwrap());
    let bridge_dir = manifest_dir.join("bridge");
    let lib_dir = libtorch.join("lib");

    // Build with CMake
    let mut cmake_config = cmake::Config::new(&bridge_dir);

    // Set libtorch path and force Torch discovery to this prefix
    cmake_config.define("CMAKE_PREFIX_PATH", &libtorch);
    cmake_config.define(
        "Torch_DIR",
        libtorch.join("share/cmake/Torch").to_str().unwrap(),
    );

    // Pass torch lib path for RPATH in the bridge library
    cmake_config.define("TORCH_LIB_PATH", lib_dir.to_str().unwrap());

    // Set build type
    let profile = env::var("PROFILE").unwrap_or_else(|_| "debug".to_string());
    let build_type = if profile == "release" {
        "Release"
    } else {
        "Debug"
    };
    cmake_config.define("CMAKE_BUILD_TYPE", build_type);

    // Handle CXX11 ABI - default to 1 for modern PyTorch
    let cxx11_abi = env::var("LIBTORCH_CXX11_ABI").unwrap_or_else(|_| "1".to_string());
    cmake_config.define(
        "CMAKE_CXX_FLAGS",
        format!("-D_GLIBCXX_USE_CXX11_ABI={}", cxx11_abi),
    );

    // The cmake crate reuses its cache unless this is disabled; a stale cache
    // keeps pointing at a previously detected libtorch.
    cmake_config.always_configure(true);

    // Build
    let dst = cmake_config.build();

    // Link the bridge library ONLY - it will load torch libraries via its own rpath
    println!("cargo:rustc-link-search=native={}/lib", dst.display());
    println!("cargo:rustc-link-lib=dylib=ts_bridge");

    // Still need search path for rpath resolution
    println!("cargo:rustc-link-search=native={}", lib_dir.display());

    // Use RPATH (not RUNPATH) for reliable library discovery
    println!("cargo:rustc-link-arg=-Wl,--disable-new-dtags");

    // Add absolute path to libtorch for the build machine
    println!("cargo:rustc-link-arg=-Wl,-rpath,{}", lib_dir.display());

    // Add relative rpath for portable deployment
    println!("cargo:rustc-link-arg=-Wl,-rpath,$ORIGIN/lib");

    // === Setup runtime library directory ===
    // Copy the bridge library and symlink torch libs to target/{profile}/lib/
    let out_dir = PathBuf::from(env::var("OUT_DIR").unwrap());
    let profile_dir = out_dir
        .parent()
        .and_then(|p| p.parent())
        .and_then(|p| p.parent())
        .expect("Could not determine profile directory from OUT_DIR");
    let profile_lib_dir = profile_dir.join("lib");

    if let Err(e) = std::fs::create_dir_all(&profile_lib_dir) {
        println!("cargo:warning=Failed to create lib dir: {}", e);
        return;
    }

    // Copy the bridge library (not symlink - it's our build artifact)
    let bridge_src = dst.join("lib/libts_bridge.so");
    let bridge_dst = profile_lib_dir.join("libts_bridge.so");
    if let Err(e) = std::fs::copy(&bridge_src, &bridge_dst) {
        println!("cargo:warning=Failed to copy bridge library: {}", e);
    }

    // Symlink torch libraries next to the bridge for $ORIGIN/lib resolution
    if let Ok(entries) = std::fs::read_dir(&lib_dir) {
        for entry in entries.flatten() {
            let name = entry.file_name().to_string_lossy().to_string();
            if name.contains(".so") {
                let dst_path = profile_lib_dir.join(&name);
                if !dst_path.exists() {
                    let _ = std::os::unix::fs::symlink(entry.path(), &dst_path);
                }
            }
        }
    }
}

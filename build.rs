use std::env;
use std::path::PathBuf;

const WATCHED_VARS: [&str; 4] = ["FFMPEG_DIR", "VCPKG_ROOT", "VCPKGRS_DYNAMIC", "VCPKGRS_TRIPLET"];

fn warn(message: impl AsRef<str>) {
    println!("cargo:warning={}", message.as_ref());
}

/// Point Windows builds at a vcpkg FFmpeg when `FFMPEG_DIR` is unset.
fn vcpkg_hint() {
    let Some(vcpkg_root) = env::var_os("VCPKG_ROOT") else {
        warn("cutscene needs the FFmpeg libraries; on Windows install them with vcpkg and set FFMPEG_DIR");
        return;
    };

    let triplet = env::var("VCPKGRS_TRIPLET").unwrap_or_else(|_| "x64-windows".to_string());
    let install_dir: PathBuf = [vcpkg_root.into(), PathBuf::from("installed"), triplet.into()]
        .iter()
        .collect();

    if !install_dir.exists() {
        warn(format!("no vcpkg FFmpeg install found under {}", install_dir.display()));
        return;
    }

    warn(format!(
        "found vcpkg FFmpeg at {0}; set FFMPEG_DIR={0} to use it explicitly",
        install_dir.display()
    ));
    if env::var_os("VCPKGRS_DYNAMIC").is_none() {
        warn("set VCPKGRS_DYNAMIC=1 if this vcpkg FFmpeg was built as DLLs");
    }
}

fn main() {
    for var in WATCHED_VARS {
        println!("cargo:rerun-if-env-changed={var}");
    }

    let windows = env::var("CARGO_CFG_TARGET_OS").is_ok_and(|os| os == "windows");
    if windows && env::var_os("FFMPEG_DIR").is_none() {
        vcpkg_hint();
    }
}

//! This build script compiles the cuda kernels to ptx when the `cuda` feature is enabled.

fn main() {
    println!("cargo:rerun-if-changed=build.rs");

    #[cfg(feature = "cuda")]
    cuda::build_ptx();
}

#[cfg(feature = "cuda")]
mod cuda {
    pub fn build_ptx() {
        let out_dir = std::env::var("OUT_DIR").unwrap();
        let kernel_paths: Vec<std::path::PathBuf> = glob::glob("src/**/*.cu")
            .unwrap()
            .map(|p| p.unwrap())
            .collect();
        let mut include_directories: Vec<std::path::PathBuf> = glob::glob("src/**/*.cuh")
            .unwrap()
            .map(|p| p.unwrap())
            .collect();

        for path in &kernel_paths {
            println!("cargo:rerun-if-changed={}", path.display());
        }
        for path in &mut include_directories {
            println!("cargo:rerun-if-changed={}", path.display());
            // keep only the directory
            path.pop();
        }

        include_directories.sort();
        include_directories.dedup();

        let include_options: Vec<String> = include_directories
            .into_iter()
            .map(|s| "-I".to_string() + &s.into_os_string().into_string().unwrap())
            .collect::<Vec<_>>();

        println!("cargo:rerun-if-env-changed=CUDA_COMPUTE_CAP");
        let compute_cap = match std::env::var("CUDA_COMPUTE_CAP") {
            Ok(cap) => cap.replace('.', ""),
            Err(_) => {
                let out = std::process::Command::new("nvidia-smi")
                    .arg("--query-gpu=compute_cap")
                    .arg("--format=csv")
                    .output()
                    .expect("nvidia-smi not found, set CUDA_COMPUTE_CAP");
                let out = std::str::from_utf8(&out.stdout).unwrap();
                let mut lines = out.lines();
                assert_eq!(lines.next().unwrap(), "compute_cap");
                lines.next().unwrap().replace('.', "")
            }
        };

        let start = std::time::Instant::now();
        let children = kernel_paths
            .iter()
            .map(|p| {
                std::process::Command::new("nvcc")
                    .arg(format!("--gpu-architecture=sm_{compute_cap}"))
                    .arg("--ptx")
                    .args(["--default-stream", "per-thread"])
                    .args(["--output-directory", &out_dir])
                    .args(&include_options)
                    .arg(p)
                    .spawn()
                    .expect("nvcc not found")
            })
            .collect::<Vec<_>>();

        for (kernel_path, child) in kernel_paths.iter().zip(children.into_iter()) {
            let output = child.wait_with_output().unwrap();
            assert!(
                output.status.success(),
                "nvcc error while compiling {kernel_path:?}: {output:?}",
            );
        }

        println!(
            "cargo:warning=Compiled {:?} cuda kernels in {:?}",
            kernel_paths.len(),
            start.elapsed()
        );
    }
}

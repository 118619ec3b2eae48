#[allow(clippy::unwrap_used)]
fn check_dirent_has_field(cfg_name: &str) {
    // Declare the cfg so `check-cfg` accepts it whether or not it ends up set
    println!("cargo:rustc-check-cfg=cfg({cfg_name})");
    let out = std::env::var("OUT_DIR").unwrap();
    let c_file = format!("check_{cfg_name}.c");
    let src = std::path::PathBuf::from(&out).join(&c_file);

    // `has_<field>` probes `struct dirent` for `<field>`
    let field_name = cfg_name.strip_prefix("has_").unwrap_or(cfg_name);
    assert!(
        field_name.starts_with("d_"),
        "probed fields belong to struct dirent"
    );

    let code = format!(
        "#include <dirent.h>\n#include <stddef.h>\nstatic const size_t off = offsetof(struct dirent, {field_name});\nint main(void) {{ (void)off; return 0; }}\n",
    );
    std::fs::write(&src, code).unwrap();

    let mut build = cc::Build::new();
    build.file(&src).cargo_warnings(false).cargo_output(true);

    // The probe only compiles when the field exists
    if build.try_compile(&c_file).is_ok() {
        println!("cargo:rustc-cfg={cfg_name}");
    }
}

fn main() {
    println!("cargo:rerun-if-changed=build.rs");

    // Without d_type every child of a directory needs an lstat to learn its type
    check_dirent_has_field("has_d_type");
}

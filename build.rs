use vergen::{vergen, Config};

fn main() {
    // Source tarballs have no .git; keep the VERGEN_* variables defined
    // so env!() lookups in the crate never fail.
    if vergen(Config::default()).is_err() {
        for key in [
            "VERGEN_BUILD_DATE",
            "VERGEN_BUILD_TIMESTAMP",
            "VERGEN_GIT_SHA",
            "VERGEN_GIT_SHA_SHORT",
        ] {
            println!("cargo:rustc-env={key}=unknown");
        }
    }
}

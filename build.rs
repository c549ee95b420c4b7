use time::OffsetDateTime;

/// Exports `var` to the crate, formatted from `now` unless already set.
fn stamp(var: &str, now: OffsetDateTime, format: &str) {
    let value = std::env::var(var).unwrap_or_else(|_| {
        time::format_description::parse(format)
            .ok()
            .and_then(|f| now.format(&f).ok())
            .unwrap_or_else(|| "unknown".to_string())
    });
    println!("cargo:rerun-if-env-changed={var}");
    println!("cargo:rustc-env={var}={value}");
}

fn main() {
    let now = OffsetDateTime::now_utc();
    stamp("CYBERAY_BUILD_DATE", now, "[year]-[month]-[day]");
    stamp("CYBERAY_BUILD_TIME", now, "[hour]:[minute]");
}

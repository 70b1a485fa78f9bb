use time::OffsetDateTime;

/// Build instant: `SOURCE_DATE_EPOCH` when set, otherwise now.
fn build_instant() -> OffsetDateTime {
    std::env::var("SOURCE_DATE_EPOCH")
        .ok()
        .and_then(|secs| secs.trim().parse::<i64>().ok())
        .and_then(|secs| OffsetDateTime::from_unix_timestamp(secs).ok())
        .unwrap_or_else(OffsetDateTime::now_utc)
}

fn main() {
    println!("cargo:rerun-if-env-changed=SOURCE_DATE_EPOCH");
    println!("cargo:rerun-if-env-changed=RTTI_STREAM_BUILD_STAMP");

    let stamp = std::env::var("RTTI_STREAM_BUILD_STAMP").unwrap_or_else(|_| {
        time::format_description::parse("[year]-[month]-[day] [hour]:[minute]:[second] UTC")
            .ok()
            .and_then(|fmt| build_instant().format(&fmt).ok())
            .unwrap_or_else(|| "unknown".to_string())
    });
    println!("cargo:rustc-env=RTTI_STREAM_BUILD_STAMP={}", stamp);
}

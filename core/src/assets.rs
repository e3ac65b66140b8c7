use rust_embed::RustEmbed;

#[derive(RustEmbed)]
#[folder = "assets/"]
struct Asset;

/// UTF-8 contents of an embedded asset, `None` if absent.
pub(crate) fn text(path: &str) -> Option<String> {
    let file = Asset::get(path)?;
    String::from_utf8(file.data.into_owned()).ok()
}

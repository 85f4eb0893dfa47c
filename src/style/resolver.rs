use std::collections::{BTreeSet, HashSet};

use tracing::debug;

use super::{
    ClassOverride, FontDescriptor, FontName, FontRequest, Point, ResolvedStyle, ResolvedStyleSet,
    Rgb, StyleClass, StyleOverrides, BOLD, BOLD_ITALIC, DEFAULT_FONT_FAMILY, ITALIC, REGULAR,
};
use crate::cache::ResourceCaches;
use crate::host::ResourceHost;

/// Substrings that make a variant name bold-like.
const BOLD_HINTS: [&str; 4] = ["bold", "medium", "black", "heavy"];

/// Substrings that make a variant name italic-like.
const ITALIC_HINTS: [&str; 2] = ["italic", "oblique"];

/// Map a variant name to the nearest canonical variant.
///
/// Matching is case-insensitive and by substring, so "SemiBold", "ExtraBold"
/// and "Medium" all become bold and "Oblique" becomes italic.
pub fn remap_variant(style: &str) -> &'static str {
    let lower = style.to_lowercase();
    let bold = BOLD_HINTS.iter().any(|hint| lower.contains(hint));
    let italic = ITALIC_HINTS.iter().any(|hint| lower.contains(hint));

    match (bold, italic) {
        (true, true) => BOLD_ITALIC,
        (true, false) => BOLD,
        (false, true) => ITALIC,
        (false, false) => REGULAR,
    }
}

/// Build the font descriptor for one class.
///
/// All four requested pairs must be available. Otherwise every variant moves
/// to the default family, so one resolved style never mixes families.
fn select_font(request: &FontRequest, available: &HashSet<FontName>) -> (FontDescriptor, bool) {
    let [regular, bold, italic, bold_italic] = request.font_names();

    if [&regular, &bold, &italic, &bold_italic]
        .iter()
        .all(|font| available.contains(*font))
    {
        return (
            FontDescriptor {
                regular,
                bold,
                italic,
                bold_italic,
            },
            false,
        );
    }

    let fallback = |style: &str| FontName::new(DEFAULT_FONT_FAMILY, remap_variant(style));
    (
        FontDescriptor {
            regular: fallback(&request.regular),
            bold: fallback(&request.bold),
            italic: fallback(&request.italic),
            bold_italic: fallback(&request.bold_italic),
        },
        true,
    )
}

fn resolve_class(
    class: StyleClass,
    overrides: Option<&ClassOverride>,
    available: &HashSet<FontName>,
) -> ResolvedStyle {
    let default_request = class.default_font();
    let request = overrides
        .and_then(|o| o.font.as_ref())
        .unwrap_or(&default_request);
    let (font, fell_back) = select_font(request, available);

    let size = overrides
        .and_then(|o| o.size)
        .filter(|size| size.is_finite() && *size > 0.0)
        .unwrap_or_else(|| class.default_size());

    let color = overrides
        .and_then(|o| o.color.as_deref())
        .and_then(Rgb::parse_hex)
        .unwrap_or_else(|| class.default_color());

    let position = overrides.and_then(|o| match (o.x, o.y) {
        (None, None) => None,
        (x, y) => Some(Point {
            x: x.unwrap_or(0.0),
            y: y.unwrap_or(0.0),
        }),
    });

    if fell_back {
        debug!(
            class = ?class,
            requested = %request.family,
            "Font family unavailable, falling back to {}",
            DEFAULT_FONT_FAMILY
        );
    }

    ResolvedStyle {
        class,
        font,
        size,
        color,
        position,
        library_style: None,
        fell_back,
    }
}

/// Merge `overrides` over the built-in defaults for every class.
pub fn resolve(overrides: &StyleOverrides, available: &HashSet<FontName>) -> ResolvedStyleSet {
    ResolvedStyleSet {
        styles: StyleClass::ALL.map(|class| resolve_class(class, overrides.get(&class), available)),
    }
}

/// Every font the resolver may ask for given `overrides`, including the four
/// canonical variants of the default family.
pub fn requested_fonts(overrides: &StyleOverrides) -> BTreeSet<FontName> {
    let mut fonts: BTreeSet<FontName> = FontRequest::family(DEFAULT_FONT_FAMILY)
        .font_names()
        .into_iter()
        .collect();

    for class in StyleClass::ALL {
        let request = overrides
            .get(&class)
            .and_then(|o| o.font.clone())
            .unwrap_or_else(|| class.default_font());
        fonts.extend(request.font_names());
    }

    fonts
}

/// Load the fonts and library styles a slide needs, then resolve its styles.
pub async fn prepare_styles<H: ResourceHost + ?Sized>(
    overrides: &StyleOverrides,
    caches: &ResourceCaches,
    host: &H,
) -> ResolvedStyleSet {
    caches
        .fonts
        .load_all(host, requested_fonts(overrides).iter())
        .await;

    let available = caches.fonts.available().await;
    let mut styles = resolve(overrides, &available);

    for (class, class_override) in overrides {
        if let Some(ref key) = class_override.library_style {
            styles.get_mut(*class).library_style = caches.styles.import(host, key).await;
        }
    }

    styles
}

//! End-to-end rendering through the public API: config file on disk,
//! pre-resolved image records, assembled attributes, serialized HTML.

use responsive_picture::config::{self, Config, ConfigError};
use responsive_picture::error::PictureError;
use responsive_picture::markup;
use responsive_picture::picture::{PictureAssembler, PictureRequest};
use responsive_picture::sizes::{self, SizesRequest, SizesSpec};
use responsive_picture::source::{ImageSource, StaticImage, StaticImageHost};
use tempfile::TempDir;

const HERO: &str = r#"{
    "width": 1600,
    "height": 900,
    "extension": "jpg",
    "alt": "Hero",
    "url": "/media/hero.jpg",
    "srcset": "/media/hero-800.jpg 800w, /media/hero-1600.jpg 1600w",
    "srcset_webp": "/media/hero-800.webp 800w, /media/hero-1600.webp 1600w",
    "placeholder": "data:image/webp;base64,UklG"
}"#;

fn site_config(toml: &str) -> (TempDir, Config) {
    let tmp = TempDir::new().unwrap();
    std::fs::write(tmp.path().join("config.toml"), toml).unwrap();
    let config = config::load_config(tmp.path()).unwrap();
    (tmp, config)
}

fn host() -> StaticImageHost {
    let mut host = StaticImageHost::new();
    host.insert("hero", serde_json::from_str::<StaticImage>(HERO).unwrap());
    host
}

fn render_html(config: &Config, request_json: &str) -> Result<String, PictureError> {
    let host = host();
    let request: PictureRequest = serde_json::from_str(request_json).unwrap();
    let output = PictureAssembler::new(config, &host)
        .render(&ImageSource::File("hero".into()), &request)?;
    Ok(markup::render_optional(output.as_ref()).into_string())
}

const GRID: &str = r#"
[grid]
container_width = 1180
columns = 12

[grid.breakpoints]
lg = 1280
"#;

#[test]
fn half_width_above_lg_in_fixed_container() {
    let (_tmp, config) = site_config(GRID);
    let spans = sizes::parse_column_spans("lg:6").unwrap();
    let request = SizesRequest::default().with_spec(SizesSpec::Classes(spans));

    assert_eq!(
        sizes::render(&config.grid, &request).unwrap(),
        "(max-width: 1179.98px) 50vw, (max-width: 1279.98px) 590px, 1180px"
    );
}

#[test]
fn eager_picture_markup() {
    let (_tmp, config) = site_config(GRID);
    let html = render_html(&config, r#"{"ratio": "16/9", "sizes": "lg:6"}"#).unwrap();

    let sizes = "(max-width: 1179.98px) 50vw, (max-width: 1279.98px) 590px, 1180px";
    let expected = format!(
        "<picture class=\"cover\" data-extension=\"jpg\" style=\"--aspect-ratio: 56.25%;\">\
         <source sizes=\"{sizes}\" \
         srcset=\"/media/hero-800.webp 800w, /media/hero-1600.webp 1600w\" type=\"image/webp\">\
         <img alt=\"Hero\" sizes=\"{sizes}\" src=\"/media/hero.jpg\" \
         srcset=\"/media/hero-800.jpg 800w, /media/hero-1600.jpg 1600w\">\
         </picture>"
    );
    assert_eq!(html, expected);
}

#[test]
fn lazy_picture_with_placeholder() {
    let (_tmp, config) = site_config(
        r#"
legacy_aspect_ratio = false

[placeholder]
enabled = true
"#,
    );
    let html = render_html(&config, r#"{"ratio": 1, "lazy": true, "as": "div"}"#).unwrap();

    assert!(html.starts_with("<div class=\"cover\" data-extension=\"jpg\" style=\"aspect-ratio: 1;\">"));
    assert!(html.contains("data-src=\"/media/hero.jpg\""));
    assert!(html.contains("data-sizes=\"auto\""));
    assert!(html.contains("sizes=\"auto\""));
    assert!(html.contains("data-aspectratio=\"1\""));
    assert!(html.contains("background-image: url(&quot;data:image/webp;base64,UklG&quot;);"));
    assert!(!html.contains("<source"));
    assert!(html.ends_with("</div>"));
}

#[test]
fn missing_asset_renders_nothing() {
    let config = Config::default();
    let host = host();
    let output = PictureAssembler::new(&config, &host)
        .render(&ImageSource::Path("gone".into()), &PictureRequest::default())
        .unwrap();
    assert_eq!(markup::render_optional(output.as_ref()).into_string(), "");
}

#[test]
fn broken_configuration_surfaces_as_error() {
    let (_tmp, config) = site_config(GRID);
    let err = render_html(&config, r#"{"sizes": {"lg": 1.5}}"#).unwrap_err();
    assert!(matches!(
        err,
        PictureError::Config(ConfigError::ShareOutOfRange { .. })
    ));

    let err = render_html(&config, r#"{"sizes": "xxxl:4"}"#).unwrap_err();
    assert!(matches!(
        err,
        PictureError::Config(ConfigError::UnknownBreakpoint(_))
    ));
}

#[test]
fn invalid_config_file_is_rejected() {
    let tmp = TempDir::new().unwrap();
    std::fs::write(tmp.path().join("config.toml"), "[grid]\ncolumns = 0\n").unwrap();
    assert!(matches!(
        config::load_config(tmp.path()),
        Err(ConfigError::Validation(_))
    ));
}

use markfresh::application::render::{RenderContext, RenderRequest, RenderService, render_service};

const README: &str = r#"# Widgets

<!-- badges are generated -->
A small library.
* one
*   two

## Install

| Step | Command |
|------|---------|
| 1    | `cargo add widgets` |

- [x] documented
- [ ] released

~~deprecated~~ API.

## Install

![](docs/shot.png)

<img src="../assets/logo.svg" onclick="steal()">

<script>alert('x')</script>

[home](https://widgets.example.com) and [guide](docs/guide.md)

[bad](javascript:alert(1))
"#;

fn request(markdown: &str) -> RenderRequest {
    RenderRequest::new(
        markdown,
        RenderContext {
            owner: "acme".to_string(),
            repo: "widgets".to_string(),
            revision: "main".to_string(),
            document_path: "pkg/README.md".to_string(),
            raw_base_url: "https://raw.githubusercontent.com".to_string(),
        },
    )
}

fn render(markdown: &str) -> String {
    render_service()
        .render(&request(markdown))
        .expect("render succeeds")
}

#[test]
fn rendering_is_deterministic() {
    assert_eq!(render(README), render(README));
}

#[test]
fn gfm_extensions_are_rendered() {
    let html = render(README);

    assert!(html.contains("<table>"));
    assert!(html.contains("<del>deprecated</del>"));
    assert!(html.contains("type=\"checkbox\""));
    assert!(html.contains("<li>one</li>"));
    assert!(html.contains("<li>two</li>"));
}

#[test]
fn comments_and_scripts_are_removed() {
    let html = render(README);

    assert!(!html.contains("badges are generated"));
    assert!(!html.contains("<script"));
    assert!(!html.contains("alert('x')"));
    assert!(!html.contains("onclick"));
    assert!(!html.contains("javascript:"));
}

#[test]
fn duplicate_headings_get_suffixed_ids() {
    let html = render(README);

    assert!(html.contains("<h1 id=\"widgets\">Widgets</h1>"));
    assert!(html.contains("<h2 id=\"install\">Install</h2>"));
    assert!(html.contains("<h2 id=\"install-1\">Install</h2>"));
    assert!(!html.contains("data-sourcepos"));
}

#[test]
fn relative_images_resolve_against_the_document_directory() {
    let html = render(README);

    assert!(html.contains(
        "src=\"https://raw.githubusercontent.com/acme/widgets/main/pkg/docs/shot.png\""
    ));
    assert!(html.contains("alt=\"shot\""));
    assert!(html.contains(
        "src=\"https://raw.githubusercontent.com/acme/widgets/main/assets/logo.svg\""
    ));
}

#[test]
fn only_external_links_open_in_a_new_tab() {
    let html = render(README);

    assert!(html.contains("href=\"https://widgets.example.com\""));
    assert!(html.contains("target=\"_blank\""));
    assert!(html.contains("<a href=\"docs/guide.md\">guide</a>"));
}

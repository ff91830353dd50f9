use posse_models::replies::Reply;
use posse_utils::datetime::resolve_timezone;

/// Escapes the handful of characters that matter when interpolating
/// user-supplied text into hand-written HTML.
fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Renders a self-contained microformats2 h-entry page for a stored reply
/// (spec §4.M): `h-entry`, `p-name`/`p-author h-card`, `e-content`,
/// `u-in-reply-to`, `dt-published`.
pub fn render_reply_page(reply: &Reply, blog_name: &str, timezone: &str) -> String {
    let tz = resolve_timezone(timezone);
    let published = reply.created_at.with_timezone(&tz).to_rfc3339();
    let blog_name = escape(blog_name);
    let author_name = escape(&reply.author_name);
    let content = escape(&reply.content);
    let target = escape(&reply.target);
    let author_link = match &reply.author_url {
        Some(url) => format!(r#"<a class="u-url" href="{0}">{1}</a>"#, escape(url), author_name),
        None => author_name.clone(),
    };

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>Reply by {author_name} &mdash; {blog_name}</title>
<link rel="webmention" href="/webmention">
</head>
<body>
<article class="h-entry">
  <span class="p-name u-hidden">Reply by {author_name}</span>
  <div class="p-author h-card">{author_link}</div>
  <div class="e-content">{content}</div>
  <a class="u-in-reply-to" href="{target}">{target}</a>
  <time class="dt-published" datetime="{published}">{published}</time>
</article>
</body>
</html>
"#
    )
}

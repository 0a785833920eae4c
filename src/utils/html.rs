/// Strips dangerous markup from user-authored HTML/markdown.
///
/// Whitelist-based: safe tags (<b>, <p>, <a>) survive, <script>/<iframe> and
/// event-handler attributes are removed together with script bodies.
pub fn clean_html(input: &str) -> String {
    ammonia::clean(input)
}

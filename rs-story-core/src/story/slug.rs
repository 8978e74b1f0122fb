/// Number of title characters a slug is derived from.
pub const SLUG_SOURCE_CHARS: usize = 64;

/// Turns a title into a URL slug.
///
/// Takes the first 64 characters of `title`, then trims, lowercases, turns
/// whitespace into hyphens, drops everything outside `[a-z0-9-]`, collapses
/// hyphen runs and strips leading and trailing hyphens.
///
/// Applying it to its own output returns the same slug.
pub fn slugify(title: &str) -> String {
	let source: String = title.chars().take(SLUG_SOURCE_CHARS).collect();

	let mut slug = String::with_capacity(source.len());
	for c in source.trim().to_lowercase().chars() {
		let c = if c.is_whitespace() { '-' } else { c };
		if !(c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-') {
			continue;
		}
		if c == '-' && slug.ends_with('-') {
			continue;
		}
		slug.push(c);
	}

	slug.trim_matches('-').to_owned()
}

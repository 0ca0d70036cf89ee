use crate::attachment::{AllowList, SelectedFile, format_size};

pub const NO_FILES_NOTICE: &str = "No files currently selected for upload";

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PreviewItem {
	Valid { name: String, size_label: String, thumbnail: String },
	/// Only a warning naming the file; no thumbnail, no size.
	Invalid { name: String },
}
impl PreviewItem {
	pub fn caption(&self) -> String {
		match self {
			Self::Valid { name, size_label, .. } => format!("File name {name}, file size {size_label}."),
			Self::Invalid { name } => format!("File name {name}: Not a valid file type. Update your selection."),
		}
	}
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum Preview {
	#[default]
	NoFiles,
	List(Vec<PreviewItem>),
}
impl Preview {
	/// Every selected file gets an entry, in order, even though only the first one is ever submitted.
	pub fn build(files: &[SelectedFile], allow_list: &AllowList) -> Self {
		if files.is_empty() {
			return Self::NoFiles;
		}
		let items = files
			.iter()
			.map(|file| match allow_list.validate(file) {
				true => PreviewItem::Valid {
					name: file.name.clone(),
					size_label: format_size(file.size),
					thumbnail: file.thumbnail_src(),
				},
				false => PreviewItem::Invalid { name: file.name.clone() },
			})
			.collect();
		Self::List(items)
	}

	pub fn items(&self) -> &[PreviewItem] {
		match self {
			Self::NoFiles => &[],
			Self::List(items) => items,
		}
	}

	pub fn to_html(&self) -> String {
		match self {
			Self::NoFiles => format!("<p>{NO_FILES_NOTICE}</p>"),
			Self::List(items) => {
				let mut html = String::from("<ol>");
				for item in items {
					html.push_str("<li>");
					if let PreviewItem::Valid { name, thumbnail, .. } = item {
						let name = escape_html(name);
						html.push_str(&format!(r#"<img src="{}" alt="{name}" title="{name}">"#, escape_html(thumbnail)));
					}
					html.push_str(&format!("<p>{}</p></li>", escape_html(&item.caption())));
				}
				html.push_str("</ol>");
				html
			}
		}
	}
}
impl std::fmt::Display for Preview {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Self::NoFiles => write!(f, "{NO_FILES_NOTICE}"),
			Self::List(items) => {
				for (i, item) in items.iter().enumerate() {
					if i > 0 {
						writeln!(f)?;
					}
					write!(f, "{}. {}", i + 1, item.caption())?;
				}
				Ok(())
			}
		}
	}
}

fn escape_html(s: &str) -> String {
	let mut escaped = String::with_capacity(s.len());
	// writing into a String can't fail
	let _ = pulldown_cmark_escape::escape_html(&mut escaped, s);
	escaped
}

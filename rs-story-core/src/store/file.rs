use std::collections::BTreeSet;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Utc};
use log::{debug, warn};
use serde::de::DeserializeOwned;

use super::{ModelRecord, ModelStore, Post, PostStore, StoredModel, newest_first, timestamp_after};
use crate::error::{Result, StoryError};

/// Extension of the small file holding a model's [`ModelRecord`].
const RECORD_EXTENSION: &str = "meta";

/// Extension of the raw model blob.
const BLOB_EXTENSION: &str = "model";

/// Extension of a stored post.
const POST_EXTENSION: &str = "post";

/// Subdirectory holding posts.
const POSTS_DIR: &str = "posts";

/// Directory-backed model and post store.
///
/// # Layout
/// - `<dir>/<id>.model`: the model blob, stored as-is
/// - `<dir>/<id>.meta`: postcard-encoded [`ModelRecord`]
/// - `<dir>/posts/<id>.post`: postcard-encoded [`Post`]
///
/// # Notes
/// - Every file is written to a temporary sibling and renamed into place, so
///   a reader never sees a half-written file.
/// - A model is committed once its record is in place: the blob is written
///   first. Listing reads records only and loads blobs for the models it
///   returns.
/// - Unreadable records and posts are skipped with a warning instead of
///   failing the whole listing. Their ids stay reserved.
/// - Files whose stem is not an id are ignored.
#[derive(Debug)]
pub struct FileStore {
	dir: PathBuf,
	/// Serializes id allocation and timestamp read-modify-write.
	writer: Mutex<()>,
}

impl FileStore {
	/// Opens (and creates if needed) a store rooted at `dir`.
	pub fn open<P: AsRef<Path>>(dir: P) -> Result<Self> {
		let dir = dir.as_ref().to_path_buf();
		fs::create_dir_all(dir.join(POSTS_DIR))?;
		Ok(Self { dir, writer: Mutex::new(()) })
	}

	pub fn dir(&self) -> &Path {
		&self.dir
	}

	fn record_path(&self, id: u64) -> PathBuf {
		self.dir.join(format!("{id}.{RECORD_EXTENSION}"))
	}

	fn blob_path(&self, id: u64) -> PathBuf {
		self.dir.join(format!("{id}.{BLOB_EXTENSION}"))
	}

	fn post_path(&self, id: u64) -> PathBuf {
		self.dir.join(POSTS_DIR).join(format!("{id}.{POST_EXTENSION}"))
	}

	/// Records of every committed model, in no particular order.
	fn records(&self) -> Result<Vec<ModelRecord>> {
		let ids = ids_in(&self.dir, &[RECORD_EXTENSION])?;
		Ok(ids
			.into_iter()
			.filter_map(|id| read_or_skip::<ModelRecord>(&self.record_path(id)))
			.collect())
	}

	fn record(&self, id: u64) -> Result<ModelRecord> {
		let path = self.record_path(id);
		if !path.is_file() {
			return Err(StoryError::ModelNotFound(format!("no model with id {id}")));
		}
		Ok(postcard::from_bytes(&fs::read(path)?)?)
	}

	fn latest_model_timestamp(&self) -> Result<Option<DateTime<Utc>>> {
		Ok(self.records()?.into_iter().map(|r| r.created_at).max())
	}

	fn write_model(&self, record: ModelRecord, bytes: &[u8]) -> Result<()> {
		write_replacing(&self.blob_path(record.id), bytes)?;
		write_replacing(&self.record_path(record.id), &postcard::to_stdvec(&record)?)?;
		debug!("wrote model {} ({} bytes) to {}", record.id, bytes.len(), self.dir.display());
		Ok(())
	}

	fn posts(&self) -> Result<Vec<Post>> {
		let ids = ids_in(&self.dir.join(POSTS_DIR), &[POST_EXTENSION])?;
		Ok(ids
			.into_iter()
			.filter_map(|id| read_or_skip::<Post>(&self.post_path(id)))
			.collect())
	}
}

impl ModelStore for FileStore {
	fn save_model(&self, bytes: Vec<u8>) -> Result<ModelRecord> {
		let _guard = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
		// Stray blobs and unreadable records still hold their id
		let id = ids_in(&self.dir, &[RECORD_EXTENSION, BLOB_EXTENSION])?
			.last()
			.map_or(1, |last| last + 1);
		let record = ModelRecord { id, created_at: timestamp_after(self.latest_model_timestamp()?) };
		self.write_model(record, &bytes)?;
		Ok(record)
	}

	fn get_model(&self, id: u64) -> Result<Vec<u8>> {
		self.record(id)?;
		Ok(fs::read(self.blob_path(id))?)
	}

	fn list_recent_models(&self, limit: usize) -> Result<Vec<StoredModel>> {
		let mut records = self.records()?;
		records.sort_by(|a, b| newest_first((a.created_at, a.id), (b.created_at, b.id)));

		let mut recent = Vec::with_capacity(limit.min(records.len()));
		for record in records {
			if recent.len() == limit {
				break;
			}
			match fs::read(self.blob_path(record.id)) {
				Ok(bytes) => recent.push(StoredModel { id: record.id, bytes, created_at: record.created_at }),
				Err(e) => warn!("skipping model {}: blob unreadable: {e}", record.id),
			}
		}
		Ok(recent)
	}

	fn update_model(&self, id: u64, bytes: Vec<u8>) -> Result<ModelRecord> {
		let _guard = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
		let mut record = self.record(id)?;
		record.created_at = timestamp_after(self.latest_model_timestamp()?);
		self.write_model(record, &bytes)?;
		Ok(record)
	}
}

impl PostStore for FileStore {
	fn save_post(&self, title: &str, content: &str) -> Result<Post> {
		let _guard = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
		let id = ids_in(&self.dir.join(POSTS_DIR), &[POST_EXTENSION])?
			.last()
			.map_or(1, |last| last + 1);
		let latest = self.posts()?.into_iter().map(|p| p.created_at).max();
		let post = Post {
			id,
			title: title.to_owned(),
			content: content.to_owned(),
			created_at: timestamp_after(latest),
		};
		write_replacing(&self.post_path(id), &postcard::to_stdvec(&post)?)?;
		debug!("wrote post {id}");
		Ok(post)
	}

	fn get_post(&self, id: u64) -> Result<Post> {
		let path = self.post_path(id);
		if !path.is_file() {
			return Err(StoryError::PostNotFound(format!("no post with id {id}")));
		}
		Ok(postcard::from_bytes(&fs::read(path)?)?)
	}

	fn all_posts(&self) -> Result<Vec<Post>> {
		let mut posts = self.posts()?;
		posts.sort_by(|a, b| newest_first((a.created_at, a.id), (b.created_at, b.id)));
		Ok(posts)
	}
}

/// Id encoded in a `<id>.<extension>` file name.
fn parse_id(path: &Path, extension: &str) -> Option<u64> {
	if path.extension()? != extension {
		return None;
	}
	path.file_stem()?.to_str()?.parse().ok()
}

/// Ids of the files in `dir` carrying one of `extensions`.
fn ids_in(dir: &Path, extensions: &[&str]) -> Result<BTreeSet<u64>> {
	let mut ids = BTreeSet::new();
	for entry in fs::read_dir(dir)? {
		let path = entry?.path();
		if let Some(id) = extensions.iter().find_map(|ext| parse_id(&path, ext)) {
			ids.insert(id);
		}
	}
	Ok(ids)
}

/// Decodes a postcard file, logging and skipping it when unreadable.
fn read_or_skip<T: DeserializeOwned>(path: &Path) -> Option<T> {
	let decoded = fs::read(path)
		.map_err(StoryError::from)
		.and_then(|bytes| postcard::from_bytes(&bytes).map_err(StoryError::from));
	match decoded {
		Ok(value) => Some(value),
		Err(e) => {
			warn!("skipping unreadable {}: {e}", path.display());
			None
		}
	}
}

/// `<path>.tmp`, next to `path`.
fn temporary_path(path: &Path) -> PathBuf {
	let mut name = OsString::from(path.as_os_str());
	name.push(".tmp");
	PathBuf::from(name)
}

fn write_replacing(path: &Path, bytes: &[u8]) -> Result<()> {
	let temporary = temporary_path(path);
	fs::write(&temporary, bytes)?;
	fs::rename(&temporary, path)?;
	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn save_and_reopen() {
		let dir = tempfile::tempdir().unwrap();
		let record = {
			let store = FileStore::open(dir.path()).unwrap();
			store.save_model(b"first".to_vec()).unwrap()
		};

		let store = FileStore::open(dir.path()).unwrap();
		assert_eq!(store.get_model(record.id).unwrap(), b"first");
		let second = store.save_model(b"second".to_vec()).unwrap();
		assert_eq!(second.id, record.id + 1);
		assert!(second.created_at > record.created_at);
	}

	#[test]
	fn open_creates_missing_directory() {
		let dir = tempfile::tempdir().unwrap();
		let nested = dir.path().join("a").join("b");
		let store = FileStore::open(&nested).unwrap();
		assert!(nested.join(POSTS_DIR).is_dir());
		assert_eq!(store.dir(), nested.as_path());
	}

	#[test]
	fn update_refreshes_and_reorders() {
		let dir = tempfile::tempdir().unwrap();
		let store = FileStore::open(dir.path()).unwrap();
		let old = store.save_model(b"old".to_vec()).unwrap();
		store.save_model(b"newer".to_vec()).unwrap();

		let updated = store.update_model(old.id, b"old-updated".to_vec()).unwrap();
		assert_eq!(updated.id, old.id);

		let recent = store.list_recent_models(10).unwrap();
		assert_eq!(recent.len(), 2);
		assert_eq!(recent[0].id, old.id);
		assert_eq!(recent[0].bytes, b"old-updated");
		assert_eq!(recent[0].created_at, updated.created_at);
	}

	#[test]
	fn missing_and_stray_files() {
		let dir = tempfile::tempdir().unwrap();
		let store = FileStore::open(dir.path()).unwrap();
		fs::write(dir.path().join("notes.meta"), b"ignored").unwrap();
		fs::write(dir.path().join("corpus.txt"), b"ignored").unwrap();

		assert!(store.list_recent_models(5).unwrap().is_empty());
		assert!(matches!(store.get_model(3), Err(StoryError::ModelNotFound(_))));
		assert!(matches!(
			store.update_model(3, Vec::new()),
			Err(StoryError::ModelNotFound(_))
		));
		assert!(matches!(store.get_post(3), Err(StoryError::PostNotFound(_))));
	}

	#[test]
	fn uncommitted_blob_is_invisible() {
		let dir = tempfile::tempdir().unwrap();
		let store = FileStore::open(dir.path()).unwrap();
		fs::write(dir.path().join("1.model"), b"half").unwrap();

		assert!(store.list_recent_models(1).unwrap().is_empty());
		assert!(matches!(store.get_model(1), Err(StoryError::ModelNotFound(_))));
		assert_eq!(store.save_model(b"real".to_vec()).unwrap().id, 2);
	}

	#[test]
	fn corrupt_record_is_skipped_by_listing() {
		let dir = tempfile::tempdir().unwrap();
		let store = FileStore::open(dir.path()).unwrap();
		let good = store.save_model(b"good".to_vec()).unwrap();
		fs::write(dir.path().join("7.meta"), b"").unwrap();

		let recent = store.list_recent_models(5).unwrap();
		assert_eq!(recent.len(), 1);
		assert_eq!(recent[0].id, good.id);
		assert!(matches!(store.get_model(7), Err(StoryError::Serialization(_))));

		// The unreadable id is not reused
		assert_eq!(store.save_model(b"next".to_vec()).unwrap().id, 8);
		assert_eq!(store.list_recent_models(1).unwrap()[0].id, 8);
	}

	#[test]
	fn missing_blob_falls_through_to_the_next_model() {
		let dir = tempfile::tempdir().unwrap();
		let store = FileStore::open(dir.path()).unwrap();
		let older = store.save_model(b"older".to_vec()).unwrap();
		let newer = store.save_model(b"newer".to_vec()).unwrap();
		fs::remove_file(store.blob_path(newer.id)).unwrap();

		let recent = store.list_recent_models(1).unwrap();
		assert_eq!(recent.len(), 1);
		assert_eq!(recent[0].id, older.id);
	}

	#[test]
	fn posts_survive_reopen_and_skip_corrupt_files() {
		let dir = tempfile::tempdir().unwrap();
		let first = {
			let store = FileStore::open(dir.path()).unwrap();
			store.save_post("First", "Hello.").unwrap()
		};

		let store = FileStore::open(dir.path()).unwrap();
		assert_eq!(store.get_post(first.id).unwrap(), first);
		fs::write(dir.path().join(POSTS_DIR).join("2.post"), b"\xff").unwrap();

		let third = store.save_post("Third", "Later.").unwrap();
		assert_eq!(third.id, 3);
		let ids: Vec<u64> = store.all_posts().unwrap().iter().map(|p| p.id).collect();
		assert_eq!(ids, vec![3, 1]);
	}

	#[test]
	fn ids_come_from_file_names() {
		assert_eq!(parse_id(Path::new("/tmp/12.meta"), RECORD_EXTENSION), Some(12));
		assert_eq!(parse_id(Path::new("12.meta.tmp"), RECORD_EXTENSION), None);
		assert_eq!(parse_id(Path::new("12.model"), RECORD_EXTENSION), None);
		assert_eq!(parse_id(Path::new("latest.meta"), RECORD_EXTENSION), None);
		assert_eq!(temporary_path(Path::new("a/3.post")), PathBuf::from("a/3.post.tmp"));
	}
}

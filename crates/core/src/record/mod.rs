use std::path::PathBuf;

use crate::render::Collage;

/// Persistence collaborator. Saving is fire-and-forget: implementations report
/// failures through logging, never back to the caller.
pub trait CollageSink {
    fn save(&mut self, blob: &[u8], filename: &str);
}

impl<S: CollageSink + ?Sized> CollageSink for &mut S {
    fn save(&mut self, blob: &[u8], filename: &str) {
        (**self).save(blob, filename)
    }
}

/// Convenience for handing a whole [`Collage`] to a sink.
pub fn save_collage(sink: &mut dyn CollageSink, collage: &Collage) {
    sink.save(&collage.bytes, &collage.filename);
}

/// Writes collages into a directory on disk.
#[derive(Debug, Clone)]
pub struct DirectorySink {
    root: PathBuf,
    saved: Vec<PathBuf>,
}

impl DirectorySink {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            saved: Vec::new(),
        }
    }

    /// Paths written successfully so far.
    pub fn saved(&self) -> &[PathBuf] {
        &self.saved
    }
}

impl CollageSink for DirectorySink {
    fn save(&mut self, blob: &[u8], filename: &str) {
        let path = self.root.join(filename);
        let result = std::fs::create_dir_all(&self.root).and_then(|()| std::fs::write(&path, blob));
        match result {
            Ok(()) => {
                tracing::info!(?path, bytes = blob.len(), "collage saved");
                self.saved.push(path);
            }
            Err(err) => tracing::error!(?path, %err, "failed to save collage"),
        }
    }
}

/// Keeps saved blobs in memory.
#[derive(Debug, Default, Clone)]
pub struct MemorySink {
    saved: Vec<(String, Vec<u8>)>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn saved(&self) -> &[(String, Vec<u8>)] {
        &self.saved
    }
}

impl CollageSink for MemorySink {
    fn save(&mut self, blob: &[u8], filename: &str) {
        self.saved.push((filename.to_string(), blob.to_vec()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_sink_keeps_blobs_in_order() {
        let mut sink = MemorySink::new();
        sink.save(b"one", "a.png");
        sink.save(b"two", "b.png");

        assert_eq!(sink.saved()[0], ("a.png".to_string(), b"one".to_vec()));
        assert_eq!(sink.saved()[1].0, "b.png");
    }

    #[test]
    fn directory_sink_writes_file() {
        let root = std::env::temp_dir().join(format!("frameit-sink-{}", std::process::id()));
        let mut sink = DirectorySink::new(&root);

        let collage = Collage {
            bytes: vec![1, 2, 3],
            filename: "out.png".to_string(),
            width: 1,
            height: 1,
        };
        save_collage(&mut sink, &collage);

        let path = root.join("out.png");
        assert_eq!(sink.saved(), &[path.clone()]);
        assert_eq!(std::fs::read(&path).unwrap(), vec![1, 2, 3]);
        let _ = std::fs::remove_dir_all(&root);
    }

    #[test]
    fn directory_sink_swallows_write_errors() {
        let file = std::env::temp_dir().join(format!("frameit-blocker-{}", std::process::id()));
        std::fs::write(&file, b"x").unwrap();

        // A regular file cannot act as the output directory.
        let mut sink = DirectorySink::new(&file);
        sink.save(b"data", "out.png");

        assert!(sink.saved().is_empty());
        let _ = std::fs::remove_file(&file);
    }
}

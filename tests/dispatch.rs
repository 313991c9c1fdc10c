use std::cell::{Cell, RefCell};
use std::io::{self, Cursor};

use glam::{Vec2, Vec3};
use modelimport::formats::{Md3Module, ObjModule};
use modelimport::{
    add_triangle_to_model, Corner, Error, FileSystemHost, FormatModule, Host, LoadContext,
    LoadOptions, Loader, MemoryHost, Model, ModuleInfo, PrintLevel, Result, WHITE,
};

static TEST_INFO: ModuleInfo = ModuleInfo {
    version: "1.0",
    display_name: "Test",
    author: "tests",
    copyright: "",
    default_extensions: &["test"],
};

static OTHER_INFO: ModuleInfo = ModuleInfo {
    version: "1.0",
    display_name: "Other",
    author: "tests",
    copyright: "",
    default_extensions: &["test"],
};

/// Accepts buffers starting with `TEST` and produces a one-quad model.
struct TestModule(&'static ModuleInfo);

impl FormatModule for TestModule {
    fn info(&self) -> &ModuleInfo {
        self.0
    }

    fn can_load(&self, _file_name: &str, buffer: &[u8]) -> Result<()> {
        if buffer.starts_with(b"TEST") {
            Ok(())
        } else {
            Err(Error::Ident)
        }
    }

    fn load(&self, ctx: &LoadContext<'_>, _buffer: &[u8]) -> Result<Model> {
        let mut model = Model::new();
        model.set_frame(ctx.frame);
        let shader = model.new_shader()?;
        if let Some(s) = model.shader_mut(shader) {
            s.set_name("wood");
        }

        let st = [Vec2::ZERO];
        let color = [WHITE];
        let corner = |x: f32, y: f32| Corner {
            xyz: Vec3::new(x, y, 0.0),
            normal: Vec3::Z,
            st: &st,
            color: &color,
            smoothing_group: 0,
        };
        let (a, b, c, d) = (corner(0.0, 0.0), corner(1.0, 0.0), corner(1.0, 1.0), corner(0.0, 1.0));
        add_triangle_to_model(&mut model, &[a, b, c], Some(shader), None)?;
        add_triangle_to_model(&mut model, &[a, c, d], Some(shader), None)?;
        Ok(model)
    }
}

/// Accepts everything and then fails with the given error.
struct FailingModule(fn() -> Error);

impl FormatModule for FailingModule {
    fn info(&self) -> &ModuleInfo {
        &OTHER_INFO
    }

    fn can_load(&self, _file_name: &str, _buffer: &[u8]) -> Result<()> {
        Ok(())
    }

    fn load(&self, _ctx: &LoadContext<'_>, _buffer: &[u8]) -> Result<Model> {
        Err((self.0)())
    }
}

#[derive(Default)]
struct RecordingHost {
    files: MemoryHost,
    messages: RefCell<Vec<(PrintLevel, String)>>,
    released: Cell<usize>,
}

impl RecordingHost {
    fn with_file(mut self, name: &str, contents: &[u8]) -> Self {
        self.files.insert(name, contents);
        self
    }

    fn printed(&self, level: PrintLevel) -> usize {
        self.messages.borrow().iter().filter(|(l, _)| *l == level).count()
    }
}

impl Host for RecordingHost {
    fn load_file(&self, name: &str) -> io::Result<Vec<u8>> {
        self.files.load_file(name)
    }

    fn release_file(&self, _buffer: Vec<u8>) {
        self.released.set(self.released.get() + 1);
    }

    fn print(&self, level: PrintLevel, message: &str) {
        self.messages.borrow_mut().push((level, message.to_string()));
    }
}

fn test_loader(host: RecordingHost) -> Loader<RecordingHost> {
    Loader::with_modules(host, vec![Box::new(TestModule(&TEST_INFO))])
}

fn memory_error() -> Error {
    let err = Vec::<u8>::new().try_reserve(usize::MAX).unwrap_err();
    Error::Memory(err)
}

#[test]
fn test_load_model_end_to_end() {
    let loader = test_loader(RecordingHost::default().with_file("box.test", b"TEST data"));
    let model = loader.load_model("box.test", 0).unwrap();

    assert_eq!(model.num_surfaces(), 1);
    assert_eq!(model.num_shaders(), 1);
    assert_eq!(model.total_vertexes(), 4);
    assert_eq!(model.total_indexes(), 6);
    assert_eq!(model.file_name(), "box.test");
    assert_eq!(model.module(), Some(&TEST_INFO));
    assert_eq!(model.bounds(), (Vec3::ZERO, Vec3::new(1.0, 1.0, 0.0)));

    let (_, surface) = model.surfaces().next().unwrap();
    assert_eq!(surface.name(), "wood");
    assert_eq!(surface.indexes(), &[0, 1, 2, 0, 2, 3]);
    assert_eq!(loader.host().released.get(), 1);
}

#[test]
fn test_first_accepting_module_wins() {
    let host = RecordingHost::default().with_file("box.test", b"TEST");
    let loader = Loader::with_modules(
        host,
        vec![
            Box::new(TestModule(&OTHER_INFO)),
            Box::new(TestModule(&TEST_INFO)),
        ],
    );

    let names: Vec<&str> = loader.modules().map(|m| m.display_name).collect();
    assert_eq!(names, vec!["Other", "Test"]);
    for _ in 0..3 {
        let model = loader.load_model("box.test", 0).unwrap();
        assert_eq!(model.module(), Some(&OTHER_INFO));
    }
}

#[test]
fn test_failed_load_falls_through() {
    let host = RecordingHost::default().with_file("box.test", b"TEST");
    let loader = Loader::with_modules(
        host,
        vec![
            Box::new(FailingModule(|| Error::Invalid)),
            Box::new(TestModule(&TEST_INFO)),
        ],
    );

    let model = loader.load_model("box.test", 0).unwrap();
    assert_eq!(model.module(), Some(&TEST_INFO));
    assert_eq!(loader.host().printed(PrintLevel::Error), 1);
}

#[test]
fn test_memory_error_stops_dispatch() {
    let host = RecordingHost::default().with_file("box.test", b"TEST");
    let loader = Loader::with_modules(
        host,
        vec![
            Box::new(FailingModule(memory_error)),
            Box::new(TestModule(&TEST_INFO)),
        ],
    );

    assert!(matches!(loader.load_model("box.test", 0), Err(Error::Memory(_))));
}

#[test]
fn test_unrecognized_file() {
    let loader = test_loader(RecordingHost::default().with_file("notes.txt", b"hello"));

    match loader.load_model("notes.txt", 0) {
        Err(Error::Unrecognized(name)) => assert_eq!(name, "notes.txt"),
        other => panic!("unexpected {:?}", other),
    }
    assert_eq!(loader.host().printed(PrintLevel::Error), 0);
    assert_eq!(loader.host().released.get(), 1);
}

#[test]
fn test_missing_file_and_name() {
    let loader = test_loader(RecordingHost::default());

    assert!(matches!(loader.load_model("", 0), Err(Error::NoFileName)));
    assert!(matches!(loader.load_model("gone.test", 0), Err(Error::FileLoad(_))));
    assert_eq!(loader.host().printed(PrintLevel::Error), 2);
}

#[test]
fn test_remap_applied_after_load() {
    let host = RecordingHost::default()
        .with_file("models/box.test", b"TEST")
        .with_file("models/box.remap", b"materials {\n wood => textures/oak\n}\n");

    let loader = test_loader(host);
    let model = loader.load_model("models/box.test", 0).unwrap();
    let (_, shader) = model.shaders().next().unwrap();
    assert_eq!(shader.name(), "textures/oak");

    let loader = loader.with_options(LoadOptions { apply_remap: false });
    let model = loader.load_model("models/box.test", 0).unwrap();
    let (_, shader) = model.shaders().next().unwrap();
    assert_eq!(shader.name(), "wood");
}

#[test]
fn test_broken_remap_keeps_model() {
    let host = RecordingHost::default()
        .with_file("box.test", b"TEST")
        .with_file("box.remap", b"materials wood");

    let model = test_loader(host).load_model("box.test", 0).unwrap();
    assert_eq!(model.num_shaders(), 1);
}

#[test]
fn test_load_model_stream() {
    let loader = test_loader(RecordingHost::default());
    let module = TestModule(&TEST_INFO);

    let model = loader
        .load_model_stream(&module, Cursor::new(b"TEST and more".to_vec()), 13, 0, "stream.test")
        .unwrap();
    assert_eq!(model.total_indexes(), 6);
    assert_eq!(model.file_name(), "stream.test");

    let short = loader.load_model_stream(&module, Cursor::new(b"TEST".to_vec()), 2, 0, "s.test");
    assert!(matches!(short, Err(Error::Ident)));

    let empty = loader.load_model_stream(&module, Cursor::new(Vec::new()), 0, 0, "e.test");
    assert!(matches!(empty, Err(Error::EmptyStream)));
}

fn put_i32(out: &mut Vec<u8>, v: i32) {
    out.extend_from_slice(&v.to_le_bytes());
}

fn put_str(out: &mut Vec<u8>, s: &str, len: usize) {
    let mut raw = s.as_bytes().to_vec();
    raw.resize(len, 0);
    out.extend_from_slice(&raw);
}

/// One triangle, one frame, one shader.
fn triangle_md3() -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(b"IDP3");
    put_i32(&mut out, 15);
    put_str(&mut out, "tri", 64);
    for v in &[0, 1, 0, 1, 0, 108, 164, 164, 0] {
        put_i32(&mut out, *v);
    }
    out.resize(164, 0);

    out.extend_from_slice(b"IDP3");
    put_str(&mut out, "tri", 64);
    // flags, frames, shaders, verts, triangles, then offsets
    for v in &[0, 1, 1, 3, 1, 176, 108, 188, 212, 236] {
        put_i32(&mut out, *v);
    }
    put_str(&mut out, "textures/tri", 64);
    put_i32(&mut out, 0);
    for i in &[0, 1, 2] {
        put_i32(&mut out, *i);
    }
    for (s, t) in &[(0.0f32, 0.0f32), (1.0, 0.0), (0.0, 1.0)] {
        out.extend_from_slice(&s.to_le_bytes());
        out.extend_from_slice(&t.to_le_bytes());
    }
    for (x, y) in &[(0i16, 0i16), (64, 0), (0, 64)] {
        for c in &[*x, *y, 0, 0] {
            out.extend_from_slice(&c.to_le_bytes());
        }
    }
    out
}

#[test]
fn test_builtin_modules() {
    let host = MemoryHost::new()
        .with_file("tri.md3", triangle_md3())
        .with_file("tri.obj", "# a triangle\nv 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n");
    let loader = Loader::new(host);

    let names: Vec<&str> = loader.modules().map(|m| m.display_name).collect();
    assert_eq!(names, vec!["Quake 3 Arena", "Wavefront ASCII"]);

    let md3 = loader.load_model("tri.md3", 0).unwrap();
    assert_eq!(md3.module().map(|m| m.display_name), Some("Quake 3 Arena"));
    assert_eq!(md3.total_vertexes(), 3);
    assert_eq!(md3.total_indexes(), 3);

    let obj = loader.load_model("tri.obj", 0).unwrap();
    assert_eq!(obj.module().map(|m| m.display_name), Some("Wavefront ASCII"));
    assert_eq!(obj.total_vertexes(), 3);
    assert_eq!(obj.total_indexes(), 3);
}

#[test]
fn test_obj_from_disk() {
    let loader = Loader::new(FileSystemHost::with_root(env!("CARGO_MANIFEST_DIR")));
    let model = loader.load_model("assets/cube_uv.obj", 0).unwrap();

    assert_eq!(model.num_surfaces(), 1);
    assert_eq!(model.total_vertexes(), 24);
    assert_eq!(model.total_indexes(), 36);
    assert_eq!(model.num_shaders(), 1);
}

#[test]
fn test_module_probes_directly() {
    let md3 = triangle_md3();
    assert!(Md3Module.can_load("tri.md3", &md3).is_ok());
    assert!(ObjModule.can_load("tri.md3", &md3).is_err());
}

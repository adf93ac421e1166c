#[cfg(target_arch = "wasm32")]
fn main() {}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    if let Err(err) = native::run() {
        eprintln!("fairing_cli error: {err}");
        std::process::exit(1);
    }
}

#[cfg(not(target_arch = "wasm32"))]
mod native {
    use fairing_engine::FairingEngine;
    use fairing_engine::fairing::{
        ColliderRecord, ColliderShape, FairingBase, PartArena, PartId, PartRecord, SideGeometry,
    };
    use fairing_engine::geom::{Point3, Tolerance, Transform, Vec3};
    use std::fmt::Write as _;
    use std::fs::{self, File};
    use std::io::{BufWriter, Write};
    use std::path::{Path, PathBuf};

    const SNAPSHOT_QUANTIZE: f64 = 1e-6;
    const SNAPSHOT_DECIMALS: usize = 6;

    const USAGE: &str = r"fairing_cli (fairing-engine)

USAGE:
  fairing_cli list
  fairing_cli run <scenario|all> [options]

SCENARIOS:
  probe_free
  tall_stack_three_sides
  adapter_inline
  nested_base_inline
  empty_payload
  ogive_preset
  manual_shape

OPTIONS (run):
  --settings <path>  Load shape presets and the collider denylist from XML
  --out-dir <dir>    Write <scenario>.obj and/or <scenario>.snap to this dir (required for `all`)
  --obj <path>       Write OBJ (single scenario only)
  --snap <path>      Write snapshot (single scenario only)
  --no-obj           Skip OBJ when using --out-dir
  --no-snap          Skip snapshot when using --out-dir
  --overwrite        Overwrite existing output files
  -h, --help         Show this help
";

    pub fn run() -> Result<(), String> {
        let args: Vec<String> = std::env::args().skip(1).collect();
        let mut args = Args::new(args);

        let Some(command) = args.next() else {
            print_usage();
            return Ok(());
        };

        match command.as_str() {
            "list" => {
                print_scenarios();
                Ok(())
            }
            "run" => cmd_run(&mut args),
            "-h" | "--help" | "help" => {
                print_usage();
                Ok(())
            }
            other => Err(format!("unknown command `{other}`\n\n{USAGE}")),
        }
    }

    fn print_usage() {
        println!("{USAGE}");
    }

    fn print_scenarios() {
        for scenario in Scenario::ALL {
            println!("{}", scenario.name());
        }
    }

    struct Outputs {
        obj: bool,
        snap: bool,
        overwrite: bool,
    }

    fn cmd_run(args: &mut Args) -> Result<(), String> {
        let scenario_name = args.next().ok_or("missing scenario name")?;

        let mut out_dir: Option<PathBuf> = None;
        let mut obj_path: Option<PathBuf> = None;
        let mut snap_path: Option<PathBuf> = None;
        let mut settings: Option<String> = None;
        let mut outputs = Outputs { obj: true, snap: true, overwrite: false };

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--settings" => {
                    let path = args.value("--settings")?;
                    settings =
                        Some(fs::read_to_string(&path).map_err(|e| format!("read settings {path}: {e}"))?);
                }
                "--out-dir" => out_dir = Some(PathBuf::from(args.value("--out-dir")?)),
                "--obj" => obj_path = Some(PathBuf::from(args.value("--obj")?)),
                "--snap" => snap_path = Some(PathBuf::from(args.value("--snap")?)),
                "--overwrite" => outputs.overwrite = true,
                "--no-obj" => outputs.obj = false,
                "--no-snap" => outputs.snap = false,
                "-h" | "--help" => {
                    print_usage();
                    return Ok(());
                }
                other => return Err(format!("unknown option `{other}`\n\n{USAGE}")),
            }
        }
        let settings = settings.as_deref();

        if let Some(dir) = out_dir.as_ref() {
            if obj_path.is_some() || snap_path.is_some() {
                return Err("use either --out-dir or --obj/--snap (not both)".to_string());
            }
            if !outputs.obj && !outputs.snap {
                return Err("nothing to write (both --no-obj and --no-snap set)".to_string());
            }

            fs::create_dir_all(dir).map_err(|e| format!("create out dir: {e}"))?;

            if scenario_name == "all" {
                for scenario in Scenario::ALL {
                    run_one_scenario_to_dir(*scenario, settings, dir, &outputs)?;
                }
                return Ok(());
            }

            let scenario = Scenario::from_str(&scenario_name).ok_or_else(|| unknown_scenario(&scenario_name))?;
            return run_one_scenario_to_dir(scenario, settings, dir, &outputs);
        }

        if scenario_name == "all" {
            return Err("`run all` requires --out-dir".to_string());
        }

        let scenario = Scenario::from_str(&scenario_name).ok_or_else(|| unknown_scenario(&scenario_name))?;
        let output = run_scenario(scenario, settings)?;

        if let Some(path) = snap_path.as_deref() {
            write_text_file(path, &output.snapshot, outputs.overwrite)?;
            eprintln!("wrote {}", path.display());
        } else {
            print!("{}", output.snapshot);
        }

        if let Some(path) = obj_path.as_deref() {
            write_obj_file(path, &output, outputs.overwrite)?;
            eprintln!("wrote {}", path.display());
        }

        print_summary(&output);
        Ok(())
    }

    fn run_one_scenario_to_dir(
        scenario: Scenario,
        settings: Option<&str>,
        dir: &Path,
        outputs: &Outputs,
    ) -> Result<(), String> {
        let output = run_scenario(scenario, settings)?;

        if outputs.snap {
            let path = dir.join(format!("{}.snap", output.name));
            write_text_file(&path, &output.snapshot, outputs.overwrite)?;
            eprintln!("wrote {}", path.display());
        }

        if outputs.obj {
            let path = dir.join(format!("{}.obj", output.name));
            write_obj_file(&path, &output, outputs.overwrite)?;
            eprintln!("wrote {}", path.display());
        }

        print_summary(&output);
        Ok(())
    }

    fn print_summary(output: &ScenarioOutput) {
        let vertices: usize = output.sides.iter().map(|(_, g)| g.mesh.vertex_count()).sum();
        let triangles: usize = output.sides.iter().map(|(_, g)| g.mesh.triangle_count()).sum();
        eprintln!(
            "{}: sides={} vertices={vertices} triangles={triangles}",
            output.name,
            output.sides.len()
        );
    }

    fn unknown_scenario(name: &str) -> String {
        let mut msg = format!("unknown scenario `{name}`\n\navailable scenarios:\n");
        for scenario in Scenario::ALL {
            let _ = writeln!(msg, "  {}", scenario.name());
        }
        msg
    }

    fn write_text_file(path: &Path, text: &str, overwrite: bool) -> Result<(), String> {
        if path.exists() && !overwrite {
            return Err(format!(
                "refusing to overwrite existing file {} (use --overwrite)",
                path.display()
            ));
        }
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| format!("create dir {}: {e}", parent.display()))?;
        }
        fs::write(path, normalize_snapshot_text(text)).map_err(|e| format!("write {}: {e}", path.display()))
    }

    /// One OBJ object per side. Side meshes are local to their node, so each
    /// is placed into the base frame before writing.
    fn write_obj_file(path: &Path, output: &ScenarioOutput, overwrite: bool) -> Result<(), String> {
        if path.exists() && !overwrite {
            return Err(format!(
                "refusing to overwrite existing file {} (use --overwrite)",
                path.display()
            ));
        }
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| format!("create dir {}: {e}", parent.display()))?;
        }

        let file = File::create(path).map_err(|e| format!("create {}: {e}", path.display()))?;
        let mut w = BufWriter::new(file);
        let err = |e: std::io::Error| format!("write obj: {e}");

        writeln!(w, "# fairing-engine fairing_cli").map_err(err)?;

        let mut offset = 1u32;
        for (slot, geo) in &output.sides {
            geo.mesh.validate().map_err(|e| format!("side {slot} mesh validation failed: {e}"))?;
            writeln!(w, "o {}_side{slot}", output.name).map_err(err)?;

            let placement = geo.placement();
            for p in geo.mesh.transformed_positions(|p| placement.apply_point(p)) {
                writeln!(w, "v {} {} {}", p[0], p[1], p[2]).map_err(err)?;
            }
            for uv in &geo.mesh.uvs {
                writeln!(w, "vt {} {}", uv[0], uv[1]).map_err(err)?;
            }
            for n in &geo.mesh.normals {
                let n = placement.apply_vec(Vec3::new(n[0], n[1], n[2]));
                writeln!(w, "vn {} {} {}", n.x, n.y, n.z).map_err(err)?;
            }
            for tri in geo.mesh.indices.chunks_exact(3) {
                let a = tri[0] + offset;
                let b = tri[1] + offset;
                let c = tri[2] + offset;
                writeln!(w, "f {a}/{a}/{a} {b}/{b}/{b} {c}/{c}/{c}").map_err(err)?;
            }
            offset += u32::try_from(geo.mesh.vertex_count()).map_err(|e| format!("vertex count: {e}"))?;
        }

        w.flush().map_err(|e| format!("flush {}: {e}", path.display()))
    }

    fn normalize_snapshot_text(text: &str) -> String {
        let normalized = text.replace("\r\n", "\n");
        if normalized.ends_with('\n') {
            normalized
        } else {
            format!("{normalized}\n")
        }
    }

    fn quantize_f64(value: f64) -> f64 {
        if !value.is_finite() {
            return value;
        }
        let q = (value / SNAPSHOT_QUANTIZE).round() * SNAPSHOT_QUANTIZE;
        if q == 0.0 { 0.0 } else { q }
    }

    fn write_f64(out: &mut String, value: f64) {
        let value = quantize_f64(value);
        let _ = write!(out, "{value:.SNAPSHOT_DECIMALS$}");
    }

    fn write_scalar_line(out: &mut String, key: &str, value: f64) {
        let _ = write!(out, "{key} ");
        write_f64(out, value);
        out.push('\n');
    }

    fn write_point_line(out: &mut String, key: &str, p: Point3) {
        let _ = write!(out, "{key} ");
        write_f64(out, p.x);
        out.push(' ');
        write_f64(out, p.y);
        out.push(' ');
        write_f64(out, p.z);
        out.push('\n');
    }

    fn write_base(out: &mut String, base: &FairingBase) {
        if let Some(outcome) = base.solve_outcome() {
            let env = outcome.envelope;
            write_scalar_line(out, "envelope.base_radius", env.base_radius);
            write_scalar_line(out, "envelope.max_radius", env.max_radius);
            write_scalar_line(out, "envelope.cylinder_start", env.cylinder_start);
            write_scalar_line(out, "envelope.cylinder_end", env.cylinder_end);
            match env.inline {
                Some(top) => {
                    let _ = write!(out, "envelope.inline ");
                    write_f64(out, top.radius);
                    out.push(' ');
                    write_f64(out, top.height);
                    out.push('\n');
                }
                None => {
                    let _ = writeln!(out, "envelope.inline none");
                }
            }
            let _ = writeln!(out, "warnings {}", outcome.warnings.len());
            for (idx, warning) in outcome.warnings.iter().enumerate() {
                let _ = writeln!(out, "warning.{idx} {warning:?}");
            }
        }

        if let Some(scan) = base.scan() {
            let _ = writeln!(out, "profile.samples {}", scan.profile.len());
            write_scalar_line(out, "profile.origin", scan.profile.origin());
            write_scalar_line(out, "profile.max", scan.profile.max());
        }

        if let Some(contour) = base.contour() {
            let _ = writeln!(out, "contour {}", contour.len());
            for p in contour.points() {
                let _ = write!(out, "c ");
                write_f64(out, p.radius);
                out.push(' ');
                write_f64(out, p.height);
                out.push(' ');
                write_f64(out, p.v);
                out.push('\n');
            }
        }
    }

    fn write_side(out: &mut String, slot: usize, geo: &SideGeometry) {
        let prefix = format!("side.{slot}");
        let _ = writeln!(out, "{prefix}.vertices {}", geo.mesh.vertex_count());
        let _ = writeln!(out, "{prefix}.triangles {}", geo.mesh.triangle_count());
        let _ = writeln!(out, "{prefix}.colliders {}", geo.colliders.len());
        write_scalar_line(out, &format!("{prefix}.mesh_yaw"), geo.mesh_yaw);
        write_scalar_line(out, &format!("{prefix}.area"), geo.area);
        write_scalar_line(out, &format!("{prefix}.volume"), geo.volume);
        write_scalar_line(out, &format!("{prefix}.mass"), geo.mass);
        write_point_line(out, &format!("{prefix}.center_of_mass"), geo.center_of_mass_in_base());
        let diag = geo.mesh.diagnostics(Tolerance::WELD);
        let _ = writeln!(out, "{prefix}.diag {diag}");
    }

    fn snapshot(op: &str, sections: impl FnOnce(&mut String)) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "# fairing-engine snapshot v1");
        let _ = writeln!(out, "op {op}");
        let _ = writeln!(out, "quantize {SNAPSHOT_QUANTIZE:.1e}");
        sections(&mut out);
        normalize_snapshot_text(&out)
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Scenario {
        ProbeFree,
        TallStackThreeSides,
        AdapterInline,
        NestedBaseInline,
        EmptyPayload,
        OgivePreset,
        ManualShape,
    }

    impl Scenario {
        const ALL: &'static [Scenario] = &[
            Scenario::ProbeFree,
            Scenario::TallStackThreeSides,
            Scenario::AdapterInline,
            Scenario::NestedBaseInline,
            Scenario::EmptyPayload,
            Scenario::OgivePreset,
            Scenario::ManualShape,
        ];

        fn name(self) -> &'static str {
            match self {
                Scenario::ProbeFree => "probe_free",
                Scenario::TallStackThreeSides => "tall_stack_three_sides",
                Scenario::AdapterInline => "adapter_inline",
                Scenario::NestedBaseInline => "nested_base_inline",
                Scenario::EmptyPayload => "empty_payload",
                Scenario::OgivePreset => "ogive_preset",
                Scenario::ManualShape => "manual_shape",
            }
        }

        fn from_str(name: &str) -> Option<Self> {
            Self::ALL.iter().copied().find(|s| s.name() == name)
        }
    }

    struct ScenarioOutput {
        name: &'static str,
        sides: Vec<(usize, SideGeometry)>,
        snapshot: String,
    }

    fn boxed(center: Point3, size: Vec3) -> ColliderRecord {
        ColliderRecord::new(ColliderShape::Box { center, size })
    }

    fn base_part(name: &str) -> PartRecord {
        PartRecord::new(name).with_node("top", Point3::new(0.0, 0.1, 0.0))
    }

    /// A base carrying `payload` on its top node.
    fn stacked(payload: PartRecord) -> (PartId, PartArena) {
        let mut arena = PartArena::new();
        let base = arena.push(base_part("fairingBase"));
        let payload = arena.push(payload);
        arena.attach(base, "top", payload);
        (base, arena)
    }

    fn probe() -> PartRecord {
        PartRecord::new("probe").with_collider(boxed(Point3::new(0.0, 0.6, 0.0), Vec3::new(0.9, 1.0, 0.9)))
    }

    fn scenario_snapshot(scenario: Scenario) -> (PartId, PartArena) {
        match scenario {
            Scenario::ProbeFree | Scenario::OgivePreset | Scenario::ManualShape | Scenario::AdapterInline => {
                stacked(probe())
            }
            Scenario::TallStackThreeSides => stacked(
                PartRecord::new("stack")
                    .with_collider(boxed(Point3::new(0.0, 0.5, 0.0), Vec3::new(1.2, 0.8, 1.2)))
                    .with_collider(boxed(Point3::new(0.0, 1.6, 0.0), Vec3::new(0.8, 1.4, 0.8)))
                    .with_collider(ColliderRecord::new(ColliderShape::Sphere {
                        center: Point3::new(0.0, 2.6, 0.0),
                        radius: 0.3,
                    })),
            ),
            Scenario::NestedBaseInline => {
                let mut arena = PartArena::new();
                let base = arena.push(base_part("fairingBase"));
                let payload = arena.push(probe());
                let nested = arena.push(
                    base_part("innerBase")
                        .at(Transform::translate(Vec3::new(0.0, 1.4, 0.0)))
                        .with_fairing_base(1.0)
                        .with_collider(boxed(Point3::ORIGIN, Vec3::new(1.0, 0.2, 1.0))),
                );
                arena.attach(base, "top", payload);
                arena.link(payload, nested);
                (base, arena)
            }
            Scenario::EmptyPayload => {
                let mut arena = PartArena::new();
                let base = arena.push(base_part("fairingBase"));
                (base, arena)
            }
        }
    }

    fn configure(engine: &mut FairingEngine, scenario: Scenario) -> Result<(), String> {
        let set = |engine: &mut FairingEngine, name: &str, value: f64| {
            engine.set_param_value(name, value).map_err(|e| e.to_string())
        };
        match scenario {
            Scenario::TallStackThreeSides => engine.set_side_node_count(3).map_err(|e| e.to_string())?,
            Scenario::AdapterInline => {
                set(engine, "mode", 1.0)?;
                set(engine, "top_size", 1.0)?;
                set(engine, "height", 1.6)?;
            }
            Scenario::ManualShape => {
                set(engine, "auto_shape", 0.0)?;
                set(engine, "max_size", 1.5)?;
                set(engine, "cyl_start", 0.3)?;
                set(engine, "cyl_end", 2.0)?;
            }
            _ => {}
        }
        Ok(())
    }

    fn run_scenario(scenario: Scenario, settings: Option<&str>) -> Result<ScenarioOutput, String> {
        let mut engine = FairingEngine::new();
        if let Some(xml) = settings {
            engine.load_settings_str(xml).map_err(|e| e.to_string())?;
        }
        configure(&mut engine, scenario)?;

        let (base, arena) = scenario_snapshot(scenario);
        engine.set_payload_snapshot(base, arena);
        engine.attach_all_sides().map_err(|e| e.to_string())?;
        if scenario == Scenario::OgivePreset {
            engine.apply_preset_all("Ogive").map_err(|e| e.to_string())?;
        }
        engine.tick_native().map_err(|e| e.to_string())?;

        let base = engine.base().ok_or("no fairing base")?;
        let sides: Vec<(usize, SideGeometry)> = base
            .sides()
            .filter_map(|(slot, side)| side.geometry().map(|g| (slot, g.clone())))
            .collect();

        let snapshot = snapshot(scenario.name(), |out| {
            write_base(out, base);
            let _ = writeln!(out, "sides {}", sides.len());
            for (slot, geo) in &sides {
                write_side(out, *slot, geo);
            }
            write_scalar_line(out, "total_mass", base.total_side_mass());
        });

        Ok(ScenarioOutput { name: scenario.name(), sides, snapshot })
    }

    struct Args {
        args: Vec<String>,
        pos: usize,
    }

    impl Args {
        fn new(args: Vec<String>) -> Self {
            Self { args, pos: 0 }
        }

        fn next(&mut self) -> Option<String> {
            let arg = self.args.get(self.pos)?.clone();
            self.pos += 1;
            Some(arg)
        }

        fn value(&mut self, flag: &str) -> Result<String, String> {
            self.next().ok_or_else(|| format!("missing value for {flag}"))
        }
    }
}

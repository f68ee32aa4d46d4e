use mdlx::animation::{AnimationCurve, Interpolation, Keyframe, TrackKind};
use mdlx::builder::{MeshCandidate, RawVertex};
use mdlx::material::{FilterMode, Layer, Material};
use mdlx::mdl::MdlWriter;
use mdlx::model::{Node, Sequence, Texture};
use mdlx::{ExportSettings, MdlError, ModelBuilder};
use nalgebra_glm as glm;
use pretty_assertions::assert_eq;

fn init() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn triangle() -> MeshCandidate {
    let v = |position: [f32; 3]| RawVertex {
        position,
        normal: [0.0, 0.0, 1.0],
        uv: [0.0, 0.0],
        weights: vec![("Root".to_string(), 1.0)],
    };
    MeshCandidate {
        name: "Cube".into(),
        material_name: "Stone".into(),
        triangles: vec![[v([0.0; 3]), v([1.0, 0.0, 0.0]), v([0.0, 1.0, 0.0])]],
        ..Default::default()
    }
}

fn builder(settings: ExportSettings) -> ModelBuilder {
    let mut b = ModelBuilder::new("Crate", settings);
    b.add_material(
        Material::new("Stone").with_layer(Layer::new(Texture::new("Stone.blp"), FilterMode::Blend)),
    );
    b
}

fn looped(duration: u32) -> AnimationCurve {
    AnimationCurve::from_keyframes(
        TrackKind::Translation,
        Interpolation::Linear,
        [Keyframe::new(0, [0.0; 3]), Keyframe::new(duration as i32, [0.0, 0.0, 1.0])],
    )
    .unwrap()
    .with_global_sequence(duration)
}

#[test]
fn global_sequences_are_collected_from_curves() {
    init();
    let mut b = builder(ExportSettings::default());
    let mut root = Node::bone("Root");
    root.anim_loc = Some(looped(270));
    b.add_node(root, &glm::identity()).unwrap();
    let mut other = Node::bone("Other").with_parent("Root");
    other.anim_loc = Some(looped(1000));
    b.add_node(other, &glm::identity()).unwrap();
    b.add_mesh(triangle()).unwrap();

    let text = mdlx::save_mdl(&b.build().unwrap()).unwrap();
    assert!(
        text.contains("GlobalSequences 2 {\n\tDuration 270,\n\tDuration 1000,\n}\n"),
        "{text}"
    );
    assert!(text.contains("\t\tGlobalSeqId 0,\n"));
    assert!(text.contains("\t\tGlobalSeqId 1,\n"));
}

#[test]
fn model_without_sequences_gets_stand() {
    init();
    let mut b = builder(ExportSettings::default());
    b.add_node(Node::bone("Root"), &glm::identity()).unwrap();
    b.add_mesh(triangle()).unwrap();
    let text = mdlx::save_mdl(&b.build().unwrap()).unwrap();
    assert!(text.contains("Sequences 1 {\n\tAnim \"Stand\" {\n\t\tInterval {0, 3333},\n"));
}

#[test]
fn sequences_are_written_in_start_order() {
    let mut b = builder(ExportSettings::default());
    b.add_sequence(Sequence::new("Death", 9000, 10000));
    b.add_sequence(Sequence::new("Stand", 0, 1000));
    b.add_node(Node::bone("Root"), &glm::identity()).unwrap();
    b.add_mesh(triangle()).unwrap();
    let text = mdlx::save_mdl(&b.build().unwrap()).unwrap();
    let stand = text.find("Anim \"Stand\"").unwrap();
    let death = text.find("Anim \"Death\"").unwrap();
    assert!(stand < death);
}

#[test]
fn optimized_export_is_stable() {
    init();
    let settings = ExportSettings {
        optimize_animation: true,
        ..Default::default()
    };
    let curve = AnimationCurve::from_keyframes(
        TrackKind::Translation,
        Interpolation::Linear,
        (0..=10).map(|i| Keyframe::new(i * 100, [i as f32, 0.0, 0.0])),
    )
    .unwrap();

    let mut b = builder(settings);
    let mut root = Node::bone("Root");
    root.anim_loc = Some(curve);
    b.add_node(root, &glm::identity()).unwrap();
    b.add_mesh(triangle()).unwrap();
    let model = b.build().unwrap();

    let loc = model.nodes.get("Root").unwrap().anim_loc.clone().unwrap();
    let frames: Vec<i32> = loc.keyframes().iter().map(|k| k.frame).collect();
    assert_eq!(frames, vec![0, 1000]);

    let mut again = loc.clone();
    assert_eq!(again.optimize(0.05), 0);
    assert_eq!(again, loc);
}

#[test]
fn count_mismatch_is_an_invariant_violation() {
    let mut w = MdlWriter::new();
    w.open_counted("Textures", 2).unwrap();
    w.open("Bitmap").unwrap();
    w.close().unwrap();
    let err = w.close().unwrap_err();
    assert!(matches!(err, MdlError::InvariantViolation(_)));
}

#[test]
fn unregistered_material_texture_is_rejected() {
    let mut b = builder(ExportSettings::default());
    b.add_node(Node::bone("Root"), &glm::identity()).unwrap();
    b.add_mesh(triangle()).unwrap();
    let mut model = b.build().unwrap();
    model.textures.clear();
    assert!(matches!(
        mdlx::save_mdl(&model),
        Err(MdlError::InvariantViolation(_))
    ));
    assert!(mdlx::save_mdx(&model).is_err());
}

#[test]
fn fresnel_lines_need_v1000() {
    init();
    for (version, fresnel) in [(800, false), (900, false), (1000, true)] {
        let mut b = ModelBuilder::new(
            "Crate",
            ExportSettings {
                mdl_version: version,
                ..Default::default()
            },
        );
        let mut layer = Layer::new(Texture::new("Stone.blp"), FilterMode::Blend);
        layer.emissive_gain = 0.5;
        b.add_material(Material::new("Stone").with_layer(layer));
        b.add_node(Node::bone("Root"), &glm::identity()).unwrap();
        b.add_mesh(triangle()).unwrap();
        let text = mdlx::save_mdl(&b.build().unwrap()).unwrap();

        assert_eq!(text.contains("static EmissiveGain 0.5,"), version >= 900, "{text}");
        assert_eq!(text.contains("FresnelColor"), fresnel, "{text}");
        assert_eq!(text.contains("FresnelTeamColor"), fresnel, "{text}");
    }
}

//! Built-in scenes which act as a smoke test for the renderer, used by the command-line driver
//! and the backend test suites

use crate::{
    geometry::{Matrix4x4, Vec3, Vec3u, Vec4},
    materials::Material,
    renderer::RaytracerSettings,
    scene::{Camera, MeshData, Scene, SceneBuilder, SceneError},
};

pub struct TestSceneDescriptor {
    pub name: &'static str,
    pub scene_func: fn() -> Result<Scene, SceneError>,
    pub settings_func: fn() -> RaytracerSettings,
}

// helpers for basic meshes
fn make_quad(a: Vec3, b: Vec3, c: Vec3, d: Vec3) -> MeshData {
    MeshData::new(vec![a, b, c, d], vec![Vec3u(0, 1, 2), Vec3u(2, 3, 0)])
}

#[rustfmt::skip]
fn make_cube(side_length: f32) -> MeshData {
    let h = side_length / 2.0;
    let vertices = vec![
        Vec3(-h, -h, -h), Vec3(h, -h, -h), Vec3(h, h, -h), Vec3(-h, h, -h),
        Vec3(-h, -h,  h), Vec3(h, -h,  h), Vec3(h, h,  h), Vec3(-h, h,  h),
    ];
    let triangles = vec![
        // -z, +z
        Vec3u(0, 2, 1), Vec3u(0, 3, 2),
        Vec3u(4, 5, 6), Vec3u(4, 6, 7),
        // -y, +y
        Vec3u(0, 1, 5), Vec3u(0, 5, 4),
        Vec3u(3, 7, 6), Vec3u(3, 6, 2),
        // -x, +x
        Vec3u(0, 4, 7), Vec3u(0, 7, 3),
        Vec3u(1, 2, 6), Vec3u(1, 6, 5),
    ];
    MeshData::new(vertices, triangles)
}

fn black_background() -> RaytracerSettings {
    RaytracerSettings {
        background: Vec4::zero(),
        ..Default::default()
    }
}

fn empty_scene() -> Result<Scene, SceneError> {
    SceneBuilder::new().build()
}

fn emissive_triangle_scene() -> Result<Scene, SceneError> {
    let mut builder = SceneBuilder::new();
    let light = builder.add_material("light", Material::emissive(Vec4(1.0, 1.0, 1.0, 1.0)));

    // covers the whole view of the default camera
    let triangle = MeshData::new(
        vec![Vec3(-10.0, -10.0, -1.0), Vec3(10.0, -10.0, -1.0), Vec3(0.0, 10.0, -1.0)],
        vec![Vec3u(0, 1, 2)],
    );
    let mesh = builder.add_mesh("triangle", triangle, &[light])?;
    builder.add_instance(mesh, Matrix4x4::identity())?;
    builder.set_camera(Camera::default());
    builder.build()
}

fn emissive_triangle_settings() -> RaytracerSettings {
    RaytracerSettings {
        max_ray_depth: 4,
        samples_per_pixel: 4,
        ..black_background()
    }
}

fn cornell_box_scene() -> Result<Scene, SceneError> {
    let mut builder = SceneBuilder::new();
    let white = builder.add_material("white", Material::diffuse(Vec4(0.73, 0.73, 0.73, 1.0)));
    let red = builder.add_material("red", Material::diffuse(Vec4(0.65, 0.05, 0.05, 1.0)));
    let green = builder.add_material("green", Material::diffuse(Vec4(0.12, 0.45, 0.15, 1.0)));
    let light = builder.add_material("light", Material::emissive(Vec4(12.0, 12.0, 12.0, 1.0)));

    let walls = [
        ("floor", white, [Vec3(-1.0, 0.0, -1.0), Vec3(1.0, 0.0, -1.0), Vec3(1.0, 0.0, 1.0), Vec3(-1.0, 0.0, 1.0)]),
        ("ceiling", white, [Vec3(-1.0, 2.0, -1.0), Vec3(1.0, 2.0, -1.0), Vec3(1.0, 2.0, 1.0), Vec3(-1.0, 2.0, 1.0)]),
        ("back", white, [Vec3(-1.0, 0.0, -1.0), Vec3(1.0, 0.0, -1.0), Vec3(1.0, 2.0, -1.0), Vec3(-1.0, 2.0, -1.0)]),
        ("left", red, [Vec3(-1.0, 0.0, -1.0), Vec3(-1.0, 0.0, 1.0), Vec3(-1.0, 2.0, 1.0), Vec3(-1.0, 2.0, -1.0)]),
        ("right", green, [Vec3(1.0, 0.0, -1.0), Vec3(1.0, 0.0, 1.0), Vec3(1.0, 2.0, 1.0), Vec3(1.0, 2.0, -1.0)]),
        ("light", light, [Vec3(-0.3, 1.98, -0.3), Vec3(0.3, 1.98, -0.3), Vec3(0.3, 1.98, 0.3), Vec3(-0.3, 1.98, 0.3)]),
    ];
    for (name, material, [a, b, c, d]) in walls {
        let mesh = builder.add_mesh(name, make_quad(a, b, c, d), &[material])?;
        builder.add_instance(mesh, Matrix4x4::identity())?;
    }

    // one mesh, two instances
    let cube = builder.add_mesh("cube", make_cube(1.0), &[white])?;
    let tall = Matrix4x4::matmul(
        Matrix4x4::translation(Vec3(-0.35, 0.6, -0.3)),
        Matrix4x4::matmul(
            Matrix4x4::rotation(0.3, Vec3(0.0, 1.0, 0.0)),
            Matrix4x4::scale(Vec3(0.6, 1.2, 0.6)),
        ),
    );
    let short = Matrix4x4::matmul(
        Matrix4x4::translation(Vec3(0.35, 0.3, 0.3)),
        Matrix4x4::matmul(
            Matrix4x4::rotation(-0.3, Vec3(0.0, 1.0, 0.0)),
            Matrix4x4::scale(Vec3(0.6, 0.6, 0.6)),
        ),
    );
    builder.add_instance(cube, tall)?;
    builder.add_instance(cube, short)?;

    builder.set_camera(Camera::look_at(
        Vec3(0.0, 1.0, 3.4),
        Vec3(0.0, 1.0, 0.0),
        Vec3(0.0, 1.0, 0.0),
        40f32.to_radians(),
        1.0,
    ));
    builder.build()
}

fn instanced_grid_scene() -> Result<Scene, SceneError> {
    let mut builder = SceneBuilder::new();
    let ground = builder.add_material("ground", Material::diffuse(Vec4(0.5, 0.5, 0.5, 1.0)));
    let orange = builder.add_material("orange", Material::diffuse(Vec4(0.9, 0.5, 0.1, 1.0)));
    let blue = builder.add_material("blue", Material::diffuse(Vec4(0.1, 0.3, 0.8, 1.0)));

    let plane = make_quad(
        Vec3(-20.0, 0.0, -20.0),
        Vec3(20.0, 0.0, -20.0),
        Vec3(20.0, 0.0, 20.0),
        Vec3(-20.0, 0.0, 20.0),
    );
    let plane = builder.add_mesh("ground", plane, &[ground])?;
    builder.add_instance(plane, Matrix4x4::identity())?;

    // alternate cube faces between two slots
    let cube = make_cube(0.8).with_slots((0..12).map(|i| (i / 2) % 2).collect());
    let cube = builder.add_mesh("cube", cube, &[orange, blue])?;
    for i in -3..=3 {
        for j in -3..=3 {
            let angle = 0.25 * (i + j) as f32;
            let m = Matrix4x4::matmul(
                Matrix4x4::translation(Vec3(i as f32 * 1.5, 0.4, j as f32 * 1.5)),
                Matrix4x4::rotation(angle, Vec3(0.0, 1.0, 0.0)),
            );
            builder.add_instance(cube, m)?;
        }
    }

    builder.set_camera(Camera::look_at(
        Vec3(6.0, 5.0, 9.0),
        Vec3(0.0, 0.0, 0.0),
        Vec3(0.0, 1.0, 0.0),
        45f32.to_radians(),
        16.0 / 9.0,
    ));
    builder.build()
}

pub fn all_test_scenes() -> &'static [TestSceneDescriptor] {
    const SCENES: &[TestSceneDescriptor] = &[
        TestSceneDescriptor {
            name: "empty",
            scene_func: empty_scene,
            settings_func: black_background,
        },
        TestSceneDescriptor {
            name: "emissive-triangle",
            scene_func: emissive_triangle_scene,
            settings_func: emissive_triangle_settings,
        },
        TestSceneDescriptor {
            name: "cornell-box",
            scene_func: cornell_box_scene,
            settings_func: black_background,
        },
        TestSceneDescriptor {
            name: "instanced-grid",
            scene_func: instanced_grid_scene,
            settings_func: RaytracerSettings::default,
        },
    ];
    SCENES
}

pub fn find_test_scene(name: &str) -> Option<&'static TestSceneDescriptor> {
    all_test_scenes().iter().find(|s| s.name == name)
}

mod common;

use common::fixtures::Fixture;
use model_forge::{
    BindingRecorder, HeadlessContext, ImportOptions, TextureKind,
    data_structures::texture::PixelFormat, load_model,
};

const TRIANGLE_GLTF: &str = r#"{
  "asset": { "version": "2.0" },
  "scene": 0,
  "scenes": [{ "nodes": [0] }],
  "nodes": [
    { "name": "root", "children": [1, 2] },
    { "name": "leaf", "mesh": 0 },
    { "name": "second", "mesh": 0 }
  ],
  "meshes": [{
    "name": "tri",
    "primitives": [{
      "attributes": { "POSITION": 0, "TEXCOORD_0": 1 },
      "indices": 2,
      "material": 0
    }]
  }],
  "materials": [{
    "name": "painted",
    "pbrMetallicRoughness": { "baseColorTexture": { "index": 0 } }
  }],
  "textures": [{ "source": 0 }],
  "images": [{ "uri": "my%20albedo.png" }],
  "buffers": [{ "uri": "tri.bin", "byteLength": 66 }],
  "bufferViews": [
    { "buffer": 0, "byteOffset": 0, "byteLength": 36 },
    { "buffer": 0, "byteOffset": 36, "byteLength": 24 },
    { "buffer": 0, "byteOffset": 60, "byteLength": 6 }
  ],
  "accessors": [
    { "bufferView": 0, "componentType": 5126, "count": 3, "type": "VEC3",
      "min": [0.0, 0.0, 0.0], "max": [1.0, 1.0, 0.0] },
    { "bufferView": 1, "componentType": 5126, "count": 3, "type": "VEC2" },
    { "bufferView": 2, "componentType": 5123, "count": 3, "type": "SCALAR" }
  ]
}"#;

fn triangle_buffer() -> Vec<u8> {
    let positions: [f32; 9] = [0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0];
    let tex_coords: [f32; 6] = [0.0, 0.0, 1.0, 0.0, 0.0, 1.0];
    let indices: [u16; 3] = [0, 1, 2];
    let mut bytes = Vec::new();
    bytes.extend_from_slice(bytemuck::cast_slice(&positions));
    bytes.extend_from_slice(bytemuck::cast_slice(&tex_coords));
    bytes.extend_from_slice(bytemuck::cast_slice(&indices));
    bytes
}

#[test]
fn imports_gltf_node_tree_with_percent_encoded_texture_uri() {
    let fixture = Fixture::new("gltf");
    fixture.write_bytes("tri.bin", &triangle_buffer());
    fixture.png("my albedo.png", 4, 2, 2);
    let path = fixture.write("tri.gltf", TRIANGLE_GLTF);

    let mut gpu = HeadlessContext::new();
    let model = load_model(&path, &ImportOptions::default(), &mut gpu).unwrap();

    // the glTF mesh is referenced by two nodes
    assert_eq!(model.num_meshes(), 2);
    assert_eq!(model.textures().len(), 1);
    let mesh = &model.meshes()[0];
    assert_eq!(mesh.name(), "tri");
    assert_eq!(mesh.indices(), &[0, 1, 2]);
    assert_eq!(mesh.vertices()[0].tex_coords, [0.0, 1.0]);
    assert!(mesh.vertices().iter().all(|v| v.has_tangent_frame()));
    assert_eq!(mesh.textures().len(), 1);
    assert_eq!(mesh.textures()[0].kind, TextureKind::Diffuse);
    assert_eq!(mesh.textures()[0].path, "my albedo.png");
    assert_eq!(gpu.vertices(mesh.buffers()), Some(mesh.vertices()));

    let mut stage = BindingRecorder::new();
    mesh.draw(&mut stage);
    assert_eq!(stage.slots(), vec![("material.texture_diffuse1".to_string(), 0)]);

    model.destroy(&mut gpu);
    assert_eq!(gpu.live_textures(), 0);
    assert_eq!(gpu.live_buffers(), 0);
    assert_eq!(gpu.invalid_releases(), 0);
}

#[test]
fn uv_flip_can_be_disabled() {
    let fixture = Fixture::new("gltf-noflip");
    fixture.write_bytes("tri.bin", &triangle_buffer());
    fixture.png("my albedo.png", 3, 2, 2);
    let path = fixture.write("tri.gltf", TRIANGLE_GLTF);

    let mut gpu = HeadlessContext::new();
    let options = ImportOptions::default().with_flip_uvs(false);
    let model = load_model(&path, &options, &mut gpu).unwrap();
    assert_eq!(model.meshes()[0].vertices()[2].tex_coords, [0.0, 1.0]);
    assert_eq!(model.meshes()[0].vertices()[0].tex_coords, [0.0, 0.0]);
    model.destroy(&mut gpu);
}

// The embedded PNG starts after the index data, 4-byte aligned.
const SKINNED_IMAGE_OFFSET: usize = 224;

const SKINNED_GLTF: &str = r#"{
  "asset": { "version": "2.0" },
  "scenes": [{ "nodes": [0] }],
  "nodes": [{ "name": "skinned", "mesh": 0 }],
  "meshes": [{
    "name": "skinned",
    "primitives": [{
      "attributes": {
        "POSITION": 0, "NORMAL": 1, "TEXCOORD_0": 2, "TANGENT": 3,
        "JOINTS_0": 4, "WEIGHTS_0": 5
      },
      "indices": 6,
      "material": 0
    }]
  }],
  "materials": [{
    "name": "packed",
    "pbrMetallicRoughness": { "baseColorTexture": { "index": 0 } }
  }],
  "textures": [{ "source": 0 }],
  "images": [{ "bufferView": 7, "mimeType": "image/png" }],
  "buffers": [{ "uri": "skinned.bin", "byteLength": BUFFER_LENGTH }],
  "bufferViews": [
    { "buffer": 0, "byteOffset": 0, "byteLength": 36 },
    { "buffer": 0, "byteOffset": 36, "byteLength": 36 },
    { "buffer": 0, "byteOffset": 72, "byteLength": 24 },
    { "buffer": 0, "byteOffset": 96, "byteLength": 48 },
    { "buffer": 0, "byteOffset": 144, "byteLength": 24 },
    { "buffer": 0, "byteOffset": 168, "byteLength": 48 },
    { "buffer": 0, "byteOffset": 216, "byteLength": 6 },
    { "buffer": 0, "byteOffset": 224, "byteLength": IMAGE_LENGTH }
  ],
  "accessors": [
    { "bufferView": 0, "componentType": 5126, "count": 3, "type": "VEC3",
      "min": [0.0, 0.0, 0.0], "max": [1.0, 1.0, 0.0] },
    { "bufferView": 1, "componentType": 5126, "count": 3, "type": "VEC3" },
    { "bufferView": 2, "componentType": 5126, "count": 3, "type": "VEC2" },
    { "bufferView": 3, "componentType": 5126, "count": 3, "type": "VEC4" },
    { "bufferView": 4, "componentType": 5123, "count": 3, "type": "VEC4" },
    { "bufferView": 5, "componentType": 5126, "count": 3, "type": "VEC4" },
    { "bufferView": 6, "componentType": 5123, "count": 3, "type": "SCALAR" }
  ]
}"#;

fn skinned_buffer(image: &[u8]) -> Vec<u8> {
    let positions: [f32; 9] = [0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0];
    let normals: [f32; 9] = [0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0];
    let tex_coords: [f32; 6] = [0.0, 0.0, 1.0, 0.0, 0.0, 1.0];
    // mirrored UVs: w = -1
    let tangents: [f32; 12] = [1.0, 0.0, 0.0, -1.0, 1.0, 0.0, 0.0, -1.0, 1.0, 0.0, 0.0, -1.0];
    let joints: [u16; 12] = [3, 1, 0, 0, 3, 1, 0, 0, 3, 1, 0, 0];
    let weights: [f32; 12] = [0.75, 0.25, 0.0, 0.0, 0.75, 0.25, 0.0, 0.0, 0.75, 0.25, 0.0, 0.0];
    let indices: [u16; 3] = [0, 1, 2];

    let mut bytes = Vec::new();
    bytes.extend_from_slice(bytemuck::cast_slice(&positions));
    bytes.extend_from_slice(bytemuck::cast_slice(&normals));
    bytes.extend_from_slice(bytemuck::cast_slice(&tex_coords));
    bytes.extend_from_slice(bytemuck::cast_slice(&tangents));
    bytes.extend_from_slice(bytemuck::cast_slice(&joints));
    bytes.extend_from_slice(bytemuck::cast_slice(&weights));
    bytes.extend_from_slice(bytemuck::cast_slice(&indices));
    bytes.resize(SKINNED_IMAGE_OFFSET, 0);
    bytes.extend_from_slice(image);
    bytes
}

#[test]
fn carries_file_tangents_bones_and_buffer_view_images() {
    let fixture = Fixture::new("gltf-skinned");
    let mut image = Vec::new();
    image::RgbaImage::from_pixel(2, 2, image::Rgba([10, 20, 30, 255]))
        .write_to(&mut std::io::Cursor::new(&mut image), image::ImageFormat::Png)
        .unwrap();
    let buffer = skinned_buffer(&image);
    fixture.write_bytes("skinned.bin", &buffer);
    let document = SKINNED_GLTF
        .replace("BUFFER_LENGTH", &buffer.len().to_string())
        .replace("IMAGE_LENGTH", &image.len().to_string());
    let path = fixture.write("skinned.gltf", &document);

    let mut gpu = HeadlessContext::new();
    let model = load_model(&path, &ImportOptions::default(), &mut gpu).unwrap();

    assert_eq!(model.num_meshes(), 1);
    let mesh = &model.meshes()[0];
    for vertex in mesh.vertices() {
        assert_eq!(vertex.normal, [0.0, 0.0, 1.0]);
        assert_eq!(vertex.tangent, [1.0, 0.0, 0.0]);
        // normal x tangent * w
        assert_eq!(vertex.bitangent, [0.0, -1.0, 0.0]);
        assert_eq!(vertex.bone_ids, [3, 1, 0, 0]);
        assert_eq!(vertex.bone_weights, [0.75, 0.25, 0.0, 0.0]);
    }
    assert_eq!(gpu.vertices(mesh.buffers()), Some(mesh.vertices()));

    assert_eq!(mesh.textures().len(), 1);
    let texture = &mesh.textures()[0];
    assert_eq!(texture.kind, TextureKind::Diffuse);
    assert_eq!(texture.path, "*0");
    let upload = gpu.texture(texture.handle).unwrap();
    assert_eq!((upload.width, upload.height), (2, 2));
    assert_eq!(upload.format, PixelFormat::Rgba);

    model.destroy(&mut gpu);
    assert_eq!(gpu.live_textures(), 0);
    assert_eq!(gpu.invalid_releases(), 0);
}

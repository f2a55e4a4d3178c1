#![cfg(test)]

use crate::headless_device;
use binding_model_core::descriptor::{
	DeclarationError, ImmutableSamplerDescriptor, ResourceDescriptor, ResourceFlags, ResourceKind, SamplerDesc,
	ShaderStages, SignatureDesc, Variability,
};
use binding_model_core::signature::SerializedSignature;

fn lighting_desc(name: &str, prefix: &str) -> SignatureDesc {
	SignatureDesc::new(name)
		.binding_index(1)
		.combined_sampler_suffix("_sampler")
		.immutable_sampler(ImmutableSamplerDescriptor::new(
			format!("{}Shadow", prefix),
			ShaderStages::FRAGMENT,
			SamplerDesc::default(),
		))
		.resource(ResourceDescriptor::new(
			format!("{}Shadow", prefix),
			ShaderStages::FRAGMENT,
			ResourceKind::TextureSrv,
			Variability::Static,
		))
		.resource(ResourceDescriptor::new(
			format!("{}Shadow_sampler", prefix),
			ShaderStages::FRAGMENT,
			ResourceKind::Sampler,
			Variability::Static,
		))
		.resource(
			ResourceDescriptor::new(
				format!("{}Lights", prefix),
				ShaderStages::FRAGMENT | ShaderStages::COMPUTE,
				ResourceKind::BufferSrv,
				Variability::Mutable,
			)
			.with_flags(ResourceFlags::FORMATTED_BUFFER),
		)
		.resource(
			ResourceDescriptor::new(
				format!("{}Textures", prefix),
				ShaderStages::FRAGMENT,
				ResourceKind::TextureSrv,
				Variability::Mutable,
			)
			.with_array_size(64)
			.with_flags(ResourceFlags::RUNTIME_ARRAY),
		)
		.resource(ResourceDescriptor::new(
			format!("{}Frame", prefix),
			ShaderStages::ALL_GRAPHICS,
			ResourceKind::ConstantBuffer,
			Variability::Dynamic,
		))
}

#[test]
fn compatibility_is_reflexive_symmetric_and_ignores_names() -> anyhow::Result<()> {
	let device = headless_device()?;
	let a = device.create_signature(lighting_desc("a", "g_"))?;
	let b = device.create_signature(lighting_desc("b", "u_"))?;
	let c = device.create_signature(lighting_desc("c", "v_"))?;

	assert!(a.is_compatible_with(&a));
	assert!(a.is_compatible_with(&b));
	assert!(b.is_compatible_with(&a));
	assert!(b.is_compatible_with(&c));
	assert!(a.is_compatible_with(&c));
	Ok(())
}

#[test]
fn structural_differences_break_compatibility() -> anyhow::Result<()> {
	let device = headless_device()?;
	let base = device.create_signature(lighting_desc("base", "g_"))?;

	let other_index = device.create_signature(lighting_desc("other_index", "g_").binding_index(2))?;
	assert!(!base.is_compatible_with(&other_index));
	assert!(!other_index.is_compatible_with(&base));

	let mut desc = lighting_desc("array", "g_");
	desc.resources[3].array_size = 32;
	let array = device.create_signature(desc)?;
	assert!(!base.is_compatible_with(&array));

	let mut desc = lighting_desc("sampler", "g_");
	desc.immutable_samplers[0].desc.max_anisotropy = 16;
	let sampler = device.create_signature(desc)?;
	assert!(!base.is_compatible_with(&sampler));
	assert!(!sampler.is_compatible_with(&base));

	let mut desc = lighting_desc("stages", "g_");
	desc.resources[2].stages = ShaderStages::FRAGMENT;
	let stages = device.create_signature(desc)?;
	assert!(!base.is_compatible_with(&stages));
	Ok(())
}

#[test]
fn serialized_signature_survives_json() -> anyhow::Result<()> {
	let device = headless_device()?;
	let signature = device.create_signature(lighting_desc("lighting", "g_"))?;

	let json = serde_json::to_string(&signature.serialize())?;
	let serialized: SerializedSignature = serde_json::from_str(&json)?;
	assert_eq!(serialized, signature.serialize());

	let restored = device.signature_from_serialized(serialized)?;
	assert!(restored.is_compatible_with(&signature));
	assert!(signature.is_compatible_with(&restored));
	assert_eq!(restored.name(), "lighting");
	assert_eq!(restored.layout(), signature.layout());

	// the runtime array lives in its own space
	assert_eq!(restored.attribs(3).space, 1);
	Ok(())
}

#[test]
fn serialized_signature_from_other_layout_is_rejected() -> anyhow::Result<()> {
	let device = headless_device()?;
	let signature = device.create_signature(lighting_desc("lighting", "g_"))?;

	let mut serialized = signature.serialize();
	serialized.desc.resources[2].flags = ResourceFlags::empty();
	// now inline instead of a table slot
	let err = device.signature_from_serialized(serialized).unwrap_err();
	assert!(matches!(err, DeclarationError::AttribsMismatch { ref name, .. } if name == "g_Lights"));
	Ok(())
}

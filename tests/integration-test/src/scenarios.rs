#![cfg(test)]

use crate::headless_device;
use crate::log_capture::capture_errors;
use binding_model_core::backing::CapacityError;
use binding_model_core::cache::BoundObject;
use binding_model_core::descriptor::{
	DeclarationError, KindClass, ResourceDescriptor, ResourceFlags, ResourceKind, ShaderStages, SignatureDesc,
	Variability,
};
use binding_model_core::layout::{Parameter, ParameterGroup};
use binding_model_core::platform::BufferUsage;
use std::sync::Arc;

/// A static sampler, a mutable texture and a per-draw constant buffer.
fn material_desc(name: &str) -> SignatureDesc {
	SignatureDesc::new(name)
		.resource(ResourceDescriptor::new(
			"g_Sampler",
			ShaderStages::FRAGMENT,
			ResourceKind::Sampler,
			Variability::Static,
		))
		.resource(ResourceDescriptor::new(
			"g_Texture",
			ShaderStages::FRAGMENT,
			ResourceKind::TextureSrv,
			Variability::Mutable,
		))
		.resource(ResourceDescriptor::new(
			"cbConstants",
			ShaderStages::VERTEX | ShaderStages::FRAGMENT,
			ResourceKind::ConstantBuffer,
			Variability::Dynamic,
		))
}

#[test]
fn static_sampler_mutable_texture_dynamic_constants() -> anyhow::Result<()> {
	let device = headless_device()?;
	let signature = device.create_signature(material_desc("material"))?;
	let layout = signature.layout();

	assert_eq!(layout.parameter_count(), 3);
	assert_eq!(layout.tables().len(), 2);
	for table in layout.tables() {
		assert_eq!(table.group(), ParameterGroup::StaticMutable);
		assert_eq!(table.ranges().len(), 1);
		assert_eq!(table.size(), 1);
	}
	assert!(matches!(layout.parameter(0), Parameter::Table(t) if t.class() == KindClass::Sampler));
	assert!(matches!(layout.parameter(1), Parameter::Table(t) if t.class() == KindClass::View));
	assert!(matches!(
		layout.parameter(2),
		Parameter::Inline(i) if i.kind == ResourceKind::ConstantBuffer && i.group == ParameterGroup::Dynamic
	));
	assert!(signature.attribs(2).is_inline());

	assert_eq!(layout.persistent_size(KindClass::View), 1);
	assert_eq!(layout.persistent_size(KindClass::Sampler), 1);
	assert_eq!(layout.group_size(KindClass::View, ParameterGroup::Dynamic), 0);
	assert_eq!(layout.group_size(KindClass::Sampler, ParameterGroup::Dynamic), 0);

	let views = device.heap(KindClass::View);
	let samplers = device.heap(KindClass::Sampler);
	let (views_free, samplers_free) = (views.persistent_free(), samplers.persistent_free());
	let instance = signature.create_binding_instance(false)?;
	assert_eq!(views.persistent_free(), views_free - 1);
	assert_eq!(samplers.persistent_free(), samplers_free - 1);
	assert_eq!(
		instance.cache().descriptor_heap_space(KindClass::View).map(|a| a.len()),
		Some(1)
	);
	assert_eq!(
		instance.cache().descriptor_heap_space(KindClass::Sampler).map(|a| a.len()),
		Some(1)
	);

	drop(instance);
	assert_eq!(views.persistent_free(), views_free);
	assert_eq!(samplers.persistent_free(), samplers_free);
	Ok(())
}

#[test]
fn renamed_signatures_share_pipeline_layout() -> anyhow::Result<()> {
	let device = headless_device()?;
	let original = device.create_signature(material_desc("original"))?;
	let mut desc = material_desc("renamed");
	for (i, res) in desc.resources.iter_mut().enumerate() {
		res.name = format!("g_Renamed{}", i);
	}
	let renamed = device.create_signature(desc)?;

	assert!(original.is_compatible_with(&renamed));
	assert_eq!(original.hash(), renamed.hash());

	let first = device.pipeline_layout(&[original])?;
	let second = device.pipeline_layout(&[renamed])?;
	assert!(Arc::ptr_eq(&first, &second));
	assert_eq!(device.platform().layouts_created(), 1);
	Ok(())
}

#[test]
fn wrong_object_kind_keeps_previous_binding() -> anyhow::Result<()> {
	let device = headless_device()?;
	let signature = device.create_signature(material_desc("material"))?;
	let mut instance = signature.create_binding_instance(false)?;
	let texture = device.platform().create_texture_view("texture");
	let buffer = device.platform().create_buffer("constants", BufferUsage::Default);

	// empty slot stays empty
	let (bound, log) = capture_errors(|| instance.set_resource(2, 0, Some(BoundObject::TextureView(texture.clone()))));
	assert!(!bound);
	assert_eq!(log.count(), 1);
	assert!(log.contains("Incorrect object type"));
	assert!(signature.bound_object(instance.cache(), 2, 0).is_none());

	// bound slot keeps its buffer
	assert!(instance.set_resource(2, 0, Some(BoundObject::Buffer(buffer.clone()))));
	let (bound, log) = capture_errors(|| instance.set_resource(2, 0, Some(BoundObject::TextureView(texture))));
	assert!(!bound);
	assert_eq!(log.count(), 1);
	assert!(matches!(
		signature.bound_object(instance.cache(), 2, 0),
		Some(BoundObject::Buffer(b)) if Arc::ptr_eq(b, &buffer)
	));
	Ok(())
}

#[test]
fn oversized_arrays_are_declaration_errors() -> anyhow::Result<()> {
	let device = headless_device()?;
	let texture = |name: &str, array_size: u32| {
		ResourceDescriptor::new(name, ShaderStages::FRAGMENT, ResourceKind::TextureSrv, Variability::Mutable)
			.with_array_size(array_size)
	};

	let shared_table = SignatureDesc::new("shared_table")
		.resource(texture("g_Textures", 1 << 24))
		.resource(texture("g_Extra", 1));
	assert!(matches!(
		device.create_signature(shared_table),
		Err(DeclarationError::TooManyDescriptors { .. })
	));

	let runtime_arrays = SignatureDesc::new("runtime_arrays")
		.resource(texture("g_First", 1 << 31).with_flags(ResourceFlags::RUNTIME_ARRAY))
		.resource(texture("g_Second", 1 << 31).with_flags(ResourceFlags::RUNTIME_ARRAY));
	assert!(matches!(
		device.create_signature(runtime_arrays),
		Err(DeclarationError::ArrayTooLarge { ref name, .. }) if name == "g_First"
	));

	// nothing was allocated for the rejected signatures
	let heap = device.heap(KindClass::View);
	assert_eq!(heap.persistent_free(), heap.persistent_capacity());
	Ok(())
}

#[test]
fn exhausted_heap_fails_instance_creation_cleanly() -> anyhow::Result<()> {
	let device = headless_device()?;
	let samplers = device.heap(KindClass::Sampler).persistent_capacity();
	let signature = device.create_signature(
		SignatureDesc::new("greedy")
			.resource(ResourceDescriptor::new(
				"g_Texture",
				ShaderStages::FRAGMENT,
				ResourceKind::TextureSrv,
				Variability::Mutable,
			))
			.resource(
				ResourceDescriptor::new(
					"g_Samplers",
					ShaderStages::FRAGMENT,
					ResourceKind::Sampler,
					Variability::Mutable,
				)
				.with_array_size(samplers + 1),
			),
	)?;

	assert!(matches!(
		signature.create_binding_instance(false),
		Err(CapacityError::PersistentHeapExhausted {
			class: KindClass::Sampler,
			..
		})
	));
	// the view slots allocated before the failure were returned
	let views = device.heap(KindClass::View);
	assert_eq!(views.persistent_free(), views.persistent_capacity());
	Ok(())
}

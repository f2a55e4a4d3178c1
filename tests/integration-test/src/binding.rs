#![cfg(test)]

use crate::headless_device;
use crate::log_capture::capture_errors;
use binding_model_core::cache::BoundObject;
use binding_model_core::descriptor::{
	ImmutableSamplerDescriptor, KindClass, ResourceDescriptor, ResourceKind, SamplerDesc, ShaderStages,
	SignatureDesc, Variability,
};
use binding_model_core::layout::{CacheContent, ParameterGroup};
use binding_model_core::platform::headless::Headless;
use binding_model_core::platform::ViewType;
use binding_model_core::variable::{BindFlags, ResourceMapping};
use std::sync::Arc;

fn combined_desc() -> SignatureDesc {
	SignatureDesc::new("combined")
		.combined_sampler_suffix("_sampler")
		.resource(ResourceDescriptor::new(
			"g_Albedo",
			ShaderStages::FRAGMENT,
			ResourceKind::TextureSrv,
			Variability::Mutable,
		))
		.resource(ResourceDescriptor::new(
			"g_Albedo_sampler",
			ShaderStages::FRAGMENT,
			ResourceKind::Sampler,
			Variability::Mutable,
		))
		.resource(
			ResourceDescriptor::new(
				"g_Layers",
				ShaderStages::FRAGMENT,
				ResourceKind::TextureSrv,
				Variability::Dynamic,
			)
			.with_array_size(4),
		)
		.resource(
			ResourceDescriptor::new(
				"g_Layers_sampler",
				ShaderStages::FRAGMENT,
				ResourceKind::Sampler,
				Variability::Dynamic,
			)
			.with_array_size(4),
		)
}

#[test]
fn tables_group_resources_by_group_stages_and_class() -> anyhow::Result<()> {
	let device = headless_device()?;
	let signature = device.create_signature(
		SignatureDesc::new("tables")
			.resource(ResourceDescriptor::new(
				"a",
				ShaderStages::VERTEX,
				ResourceKind::TextureSrv,
				Variability::Static,
			))
			.resource(ResourceDescriptor::new("b", ShaderStages::VERTEX, ResourceKind::Sampler, Variability::Static))
			.resource(
				ResourceDescriptor::new("c", ShaderStages::VERTEX, ResourceKind::TextureUav, Variability::Mutable)
					.with_array_size(3),
			)
			.resource(ResourceDescriptor::new(
				"d",
				ShaderStages::FRAGMENT,
				ResourceKind::TextureSrv,
				Variability::Mutable,
			))
			.resource(
				ResourceDescriptor::new("e", ShaderStages::VERTEX, ResourceKind::BufferUav, Variability::Dynamic)
					.with_array_size(2),
			)
			.resource(ResourceDescriptor::new(
				"f",
				ShaderStages::VERTEX,
				ResourceKind::TextureSrv,
				Variability::Dynamic,
			)),
	)?;

	let layout = signature.layout();
	for table in layout.tables() {
		let mut expected_offset = 0;
		for range in table.ranges() {
			assert_eq!(range.offset_in_table, expected_offset);
			expected_offset += range.count;
		}
		assert_eq!(table.size(), expected_offset);
	}
	for index in 0..signature.resource_count() {
		let res = signature.resource(index);
		let Some(slot) = signature.attribs(index).slot(CacheContent::Instance) else {
			continue;
		};
		let table = layout
			.tables()
			.iter()
			.find(|t| t.parameter() == slot.table())
			.ok_or_else(|| anyhow::anyhow!("resource {} is in no table", res.name))?;
		assert_eq!(table.group(), ParameterGroup::of(res.variability));
		assert_eq!(table.stages(), res.stages);
		assert_eq!(table.class(), res.kind.class());
	}

	// a, c share the static/mutable vertex view table, e, f the dynamic one
	assert_eq!(layout.tables().len(), 4);
	assert_eq!(layout.persistent_size(KindClass::View), 5);
	assert_eq!(layout.persistent_size(KindClass::Sampler), 1);
	assert_eq!(layout.group_size(KindClass::View, ParameterGroup::Dynamic), 3);
	Ok(())
}

#[test]
fn persistent_size_ignores_dynamic_resources() -> anyhow::Result<()> {
	let device = headless_device()?;
	let mut sizes = Vec::new();
	for dynamic_count in 0..4 {
		let mut desc = SignatureDesc::new(format!("dynamic_{}", dynamic_count)).resource(
			ResourceDescriptor::new("g_Static", ShaderStages::COMPUTE, ResourceKind::BufferUav, Variability::Mutable)
				.with_array_size(2),
		);
		for i in 0..dynamic_count {
			desc = desc.resource(ResourceDescriptor::new(
				format!("g_Dynamic{}", i),
				ShaderStages::COMPUTE,
				ResourceKind::TextureUav,
				Variability::Dynamic,
			));
		}
		let signature = device.create_signature(desc)?;
		let layout = signature.layout();
		assert_eq!(layout.group_size(KindClass::View, ParameterGroup::Dynamic), dynamic_count);
		sizes.push(layout.persistent_size(KindClass::View));

		let instance = signature.create_binding_instance(false)?;
		assert_eq!(
			instance.cache().descriptor_heap_space(KindClass::View).map(|a| a.len()),
			Some(2)
		);
	}
	assert_eq!(sizes, vec![2; 4]);
	Ok(())
}

#[test]
fn texture_binds_its_assigned_sampler() -> anyhow::Result<()> {
	let device = headless_device()?;
	let platform = device.platform();
	let signature = device.create_signature(combined_desc())?;
	let mut instance = signature.create_binding_instance(false)?;

	// assigned samplers are no variables of their own
	assert_eq!(instance.variable_count(ShaderStages::FRAGMENT), 2);
	assert!(instance.variable(ShaderStages::FRAGMENT, "g_Albedo_sampler").is_none());

	let sampler = platform.create_sampler("linear");
	let albedo = platform.create_texture_view_with("albedo", ViewType::ShaderResource, Some(sampler.clone()));
	let (_, log) = capture_errors(|| {
		instance
			.variable(ShaderStages::FRAGMENT, "g_Albedo")
			.map(|mut v| v.set(BoundObject::TextureView(albedo)))
	});
	assert_eq!(log.count(), 0);
	assert!(matches!(
		signature.bound_object(instance.cache(), 1, 0),
		Some(BoundObject::Sampler(s)) if Arc::ptr_eq(s, &sampler)
	));

	// array elements pair up with the elements of the sampler array
	let layer_sampler = platform.create_sampler("nearest");
	let layer = platform.create_texture_view_with("layer", ViewType::ShaderResource, Some(layer_sampler.clone()));
	if let Some(mut layers) = instance.variable(ShaderStages::FRAGMENT, "g_Layers") {
		layers.set_element(2, BoundObject::TextureView(layer));
	}
	assert!(matches!(
		signature.bound_object(instance.cache(), 3, 2),
		Some(BoundObject::Sampler(s)) if Arc::ptr_eq(s, &layer_sampler)
	));
	assert!(signature.bound_object(instance.cache(), 3, 0).is_none());

	// unbinding a dynamic texture unbinds its sampler
	if let Some(mut layers) = instance.variable(ShaderStages::FRAGMENT, "g_Layers") {
		layers.unbind(2);
	}
	assert!(signature.bound_object(instance.cache(), 2, 2).is_none());
	assert!(signature.bound_object(instance.cache(), 3, 2).is_none());
	Ok(())
}

#[test]
fn texture_without_sampler_is_reported() -> anyhow::Result<()> {
	let device = headless_device()?;
	let signature = device.create_signature(combined_desc())?;
	let mut instance = signature.create_binding_instance(false)?;
	let albedo = device.platform().create_texture_view("albedo");

	let (bound, log) = capture_errors(|| instance.set_resource(0, 0, Some(BoundObject::TextureView(albedo))));
	assert!(bound);
	assert_eq!(log.count(), 1);
	assert!(signature.bound_object(instance.cache(), 0, 0).is_some());
	assert!(signature.bound_object(instance.cache(), 1, 0).is_none());
	Ok(())
}

#[test]
fn immutable_sampler_takes_no_slot() -> anyhow::Result<()> {
	let device = headless_device()?;
	let signature = device.create_signature(combined_desc().immutable_sampler(ImmutableSamplerDescriptor::new(
		"g_Albedo",
		ShaderStages::FRAGMENT,
		SamplerDesc::default(),
	)))?;
	assert!(signature.attribs(1).immutable_sampler);
	assert_eq!(signature.attribs(1).slot(CacheContent::Instance), None);
	assert!(signature.attribs(0).immutable_sampler);
	assert_eq!(signature.layout().persistent_size(KindClass::Sampler), 0);

	let mut instance = signature.create_binding_instance(false)?;
	let sampler = device.platform().create_sampler("ignored");
	let albedo = device
		.platform()
		.create_texture_view_with("albedo", ViewType::ShaderResource, Some(sampler));
	let (bound, log) = capture_errors(|| instance.set_resource(0, 0, Some(BoundObject::TextureView(albedo))));
	assert!(bound);
	assert_eq!(log.count(), 0);

	// the immutable sampler never needs binding
	let (_, log) = capture_errors(|| instance.check_resources());
	assert!(!log.contains("g_Albedo_sampler"));
	Ok(())
}

#[test]
fn non_dynamic_variables_keep_their_first_object() -> anyhow::Result<()> {
	let device = headless_device()?;
	let platform = device.platform();
	let signature = device.create_signature(combined_desc())?;
	let mut instance = signature.create_binding_instance(false)?;

	let sampler = platform.create_sampler("sampler");
	let first = platform.create_texture_view_with("first", ViewType::ShaderResource, Some(sampler.clone()));
	let second = platform.create_texture_view_with("second", ViewType::ShaderResource, Some(sampler));
	assert!(instance.set_resource(0, 0, Some(BoundObject::TextureView(first.clone()))));

	// the same object again is fine
	let (bound, log) = capture_errors(|| instance.set_resource(0, 0, Some(BoundObject::TextureView(first.clone()))));
	assert!(bound);
	assert_eq!(log.count(), 0);

	let (bound, log) = capture_errors(|| instance.set_resource(0, 0, Some(BoundObject::TextureView(second))));
	assert!(!bound);
	assert_eq!(log.count(), 1);
	assert!(log.contains("already bound"));

	let (bound, log) = capture_errors(|| instance.set_resource(0, 0, None));
	assert!(!bound);
	assert_eq!(log.count(), 1);
	assert!(matches!(
		signature.bound_object(instance.cache(), 0, 0),
		Some(BoundObject::TextureView(t)) if Arc::ptr_eq(t, &first)
	));
	Ok(())
}

#[test]
fn out_of_range_arrays_are_ignored() -> anyhow::Result<()> {
	let device = headless_device()?;
	let platform = device.platform();
	let signature = device.create_signature(combined_desc())?;
	let mut instance = signature.create_binding_instance(false)?;
	let sampler = platform.create_sampler("sampler");
	let layers: Vec<BoundObject<Headless>> = (0..3)
		.map(|i| {
			BoundObject::TextureView(platform.create_texture_view_with(
				&format!("layer{}", i),
				ViewType::ShaderResource,
				Some(sampler.clone()),
			))
		})
		.collect();

	let (_, log) = capture_errors(|| {
		if let Some(mut variable) = instance.variable(ShaderStages::FRAGMENT, "g_Layers") {
			variable.set_array(2, &layers);
		}
	});
	assert_eq!(log.count(), 1);
	assert!((0..4).all(|i| signature.bound_object(instance.cache(), 2, i).is_none()));

	let (bound, log) = capture_errors(|| instance.set_resource(2, 4, Some(layers[0].clone())));
	assert!(!bound);
	assert_eq!(log.count(), 1);

	if let Some(mut variable) = instance.variable(ShaderStages::FRAGMENT, "g_Layers") {
		variable.set_array(1, &layers);
	}
	assert!(signature.bound_object(instance.cache(), 2, 0).is_none());
	assert!((1..4).all(|i| signature.bound_object(instance.cache(), 2, i).is_some()));
	Ok(())
}

#[test]
fn resource_mapping_binds_by_name() -> anyhow::Result<()> {
	let device = headless_device()?;
	let platform = device.platform();
	let signature = device.create_signature(combined_desc())?;
	let mut instance = signature.create_binding_instance(false)?;
	let sampler = platform.create_sampler("sampler");
	let albedo = platform.create_texture_view_with("albedo", ViewType::ShaderResource, Some(sampler.clone()));
	let layer = platform.create_texture_view_with("layer", ViewType::ShaderResource, Some(sampler));

	let mut mapping = ResourceMapping::<Headless>::new();
	mapping
		.set("g_Albedo", BoundObject::TextureView(albedo))
		.set_element("g_Layers", 1, BoundObject::TextureView(layer.clone()))
		.set("g_Unused", BoundObject::TextureView(layer));

	// only mutable variables, the three missing layers are reported
	let (_, log) = capture_errors(|| {
		instance.bind_resources(
			ShaderStages::FRAGMENT,
			&mapping,
			BindFlags::UPDATE_MUTABLE | BindFlags::VERIFY_ALL_RESOLVED,
		)
	});
	assert_eq!(log.count(), 0);
	assert!(signature.bound_object(instance.cache(), 0, 0).is_some());
	assert!(signature.bound_object(instance.cache(), 2, 1).is_none());

	let (_, log) = capture_errors(|| {
		instance.bind_resources(ShaderStages::FRAGMENT, &mapping, BindFlags::VERIFY_ALL_RESOLVED)
	});
	assert_eq!(log.count(), 3);
	assert!(log.contains("g_Layers[0]"));
	assert!(signature.bound_object(instance.cache(), 2, 1).is_some());

	// stages without variables are skipped
	let (_, log) = capture_errors(|| {
		instance.bind_resources(ShaderStages::VERTEX, &mapping, BindFlags::VERIFY_ALL_RESOLVED)
	});
	assert_eq!(log.count(), 0);
	Ok(())
}

#[test]
fn keep_existing_skips_bound_elements() -> anyhow::Result<()> {
	let device = headless_device()?;
	let platform = device.platform();
	let signature = device.create_signature(combined_desc())?;
	let mut instance = signature.create_binding_instance(false)?;
	let sampler = platform.create_sampler("sampler");
	let first = platform.create_texture_view_with("first", ViewType::ShaderResource, Some(sampler.clone()));
	let second = platform.create_texture_view_with("second", ViewType::ShaderResource, Some(sampler));
	instance.set_resource(2, 0, Some(BoundObject::TextureView(first.clone())));

	let mut mapping = ResourceMapping::<Headless>::new();
	mapping.set("g_Layers", BoundObject::TextureView(second.clone()));
	instance.bind_resources(
		ShaderStages::FRAGMENT,
		&mapping,
		BindFlags::UPDATE_DYNAMIC | BindFlags::KEEP_EXISTING,
	);
	assert!(matches!(
		signature.bound_object(instance.cache(), 2, 0),
		Some(BoundObject::TextureView(t)) if Arc::ptr_eq(t, &first)
	));

	// dynamic variables are replaced without KEEP_EXISTING
	instance.bind_resources(ShaderStages::FRAGMENT, &mapping, BindFlags::UPDATE_DYNAMIC);
	assert!(matches!(
		signature.bound_object(instance.cache(), 2, 0),
		Some(BoundObject::TextureView(t)) if Arc::ptr_eq(t, &second)
	));
	Ok(())
}

#![cfg(test)]

use crate::headless_device;
use crate::log_capture::capture_errors;
use binding_model_core::cache::BoundObject;
use binding_model_core::descriptor::{
	KindClass, ResourceDescriptor, ResourceFlags, ResourceKind, ShaderStages, SignatureDesc, Variability,
};
use binding_model_core::layout::CacheContent;
use binding_model_core::platform::headless::{Headless, HeadlessDescriptor};
use binding_model_core::variable::{BindFlags, ResourceMapping};
use std::sync::Arc;

fn scene_desc() -> SignatureDesc {
	SignatureDesc::new("scene")
		.resource(ResourceDescriptor::new(
			"g_Environment",
			ShaderStages::VERTEX | ShaderStages::FRAGMENT,
			ResourceKind::TextureSrv,
			Variability::Static,
		))
		.resource(ResourceDescriptor::new(
			"g_EnvironmentSampler",
			ShaderStages::FRAGMENT,
			ResourceKind::Sampler,
			Variability::Static,
		))
		.resource(
			ResourceDescriptor::new(
				"g_Bindless",
				ShaderStages::FRAGMENT,
				ResourceKind::TextureSrv,
				Variability::Static,
			)
			.with_array_size(16)
			.with_flags(ResourceFlags::RUNTIME_ARRAY),
		)
		.resource(ResourceDescriptor::new(
			"g_Material",
			ShaderStages::FRAGMENT,
			ResourceKind::TextureSrv,
			Variability::Mutable,
		))
}

#[test]
fn static_variables_per_stage() -> anyhow::Result<()> {
	let device = headless_device()?;
	let signature = device.create_signature(scene_desc())?;

	assert_eq!(signature.static_variable_count(ShaderStages::VERTEX), 1);
	assert_eq!(signature.static_variable_count(ShaderStages::FRAGMENT), 3);
	assert_eq!(signature.static_variable_count(ShaderStages::COMPUTE), 0);
	assert!(signature.static_variable(ShaderStages::VERTEX, "g_EnvironmentSampler").is_none());
	assert!(signature.static_variable(ShaderStages::FRAGMENT, "g_Material").is_none());

	let variable = signature
		.static_variable(ShaderStages::FRAGMENT, "g_EnvironmentSampler")
		.ok_or_else(|| anyhow::anyhow!("missing static sampler"))?;
	assert_eq!(variable.resource_index(), 1);
	assert_eq!(
		signature
			.static_variable_by_index(ShaderStages::FRAGMENT, 1)
			.map(|v| v.resource_index()),
		Some(1)
	);

	assert!(!variable.is_bound(0));
	variable.set(BoundObject::Sampler(device.platform().create_sampler("sampler")));
	assert!(variable.is_bound(0));
	Ok(())
}

#[test]
fn static_resources_are_copied_into_instances() -> anyhow::Result<()> {
	let device = headless_device()?;
	let platform = device.platform();
	let signature = device.create_signature(scene_desc())?;
	let environment = platform.create_texture_view("environment");
	let sampler = platform.create_sampler("sampler");

	let mut mapping = ResourceMapping::<Headless>::new();
	mapping
		.set("g_Environment", BoundObject::TextureView(environment.clone()))
		.set("g_EnvironmentSampler", BoundObject::Sampler(sampler.clone()))
		.set("g_Material", BoundObject::TextureView(platform.create_texture_view("material")));
	signature.bind_static_resources(ShaderStages::all(), &mapping, BindFlags::empty());

	let (instance, log) = capture_errors(|| signature.create_binding_instance(true));
	let mut instance = instance?;
	assert_eq!(log.count(), 0);
	assert!(matches!(
		signature.bound_object(instance.cache(), 0, 0),
		Some(BoundObject::TextureView(t)) if Arc::ptr_eq(t, &environment)
	));
	assert!(matches!(
		signature.bound_object(instance.cache(), 1, 0),
		Some(BoundObject::Sampler(s)) if Arc::ptr_eq(s, &sampler)
	));

	// copied into the persistent descriptor storage as well
	let slot = signature
		.attribs(0)
		.slot(CacheContent::Instance)
		.ok_or_else(|| anyhow::anyhow!("static texture has no instance slot"))?;
	let offset = instance
		.cache()
		.table_heap_offset(slot.table())
		.ok_or_else(|| anyhow::anyhow!("static table is not persistent"))?
		+ slot.offset();
	let expected = instance
		.cache()
		.resource(slot.table(), slot.offset())
		.map(|r| r.descriptor)
		.unwrap_or_default();
	assert_ne!(expected, HeadlessDescriptor::default());
	assert_eq!(platform.heap_contents(KindClass::View, offset..offset + 1), vec![expected]);

	// static resources are not variables of the instance, the mutable one still needs binding
	assert!(instance.variable(ShaderStages::FRAGMENT, "g_Environment").is_none());
	let (all_bound, log) = capture_errors(|| instance.check_resources());
	assert!(!all_bound);
	assert_eq!(log.count(), 1);
	assert!(log.contains("g_Material"));

	if let Some(mut material) = instance.variable(ShaderStages::FRAGMENT, "g_Material") {
		material.set(BoundObject::TextureView(platform.create_texture_view("material")));
	}
	let (all_bound, log) = capture_errors(|| instance.check_resources());
	assert!(all_bound);
	assert_eq!(log.count(), 0);
	Ok(())
}

#[test]
fn copying_static_resources_twice() -> anyhow::Result<()> {
	let device = headless_device()?;
	let platform = device.platform();
	let signature = device.create_signature(scene_desc())?;
	let mut mapping = ResourceMapping::<Headless>::new();
	mapping
		.set("g_Environment", BoundObject::TextureView(platform.create_texture_view("environment")))
		.set("g_EnvironmentSampler", BoundObject::Sampler(platform.create_sampler("sampler")));
	signature.bind_static_resources(ShaderStages::all(), &mapping, BindFlags::UPDATE_STATIC);

	let mut instance = signature.create_binding_instance(false)?;
	assert!(signature.bound_object(instance.cache(), 0, 0).is_none());
	let (_, log) = capture_errors(|| {
		signature.initialize_static_resources(&mut instance);
		signature.initialize_static_resources(&mut instance);
	});
	assert_eq!(log.count(), 0);
	assert!(signature.bound_object(instance.cache(), 0, 0).is_some());

	// a different object already in the instance is left alone
	let mut other = signature.create_binding_instance(false)?;
	let replacement = platform.create_texture_view("replacement");
	other.set_resource(0, 0, Some(BoundObject::TextureView(replacement.clone())));
	let (_, log) = capture_errors(|| signature.initialize_static_resources(&mut other));
	assert_eq!(log.count(), 1);
	assert!(matches!(
		signature.bound_object(other.cache(), 0, 0),
		Some(BoundObject::TextureView(t)) if Arc::ptr_eq(t, &replacement)
	));
	Ok(())
}

#[test]
fn unbound_static_resources_are_reported() -> anyhow::Result<()> {
	let device = headless_device()?;
	let signature = device.create_signature(scene_desc())?;

	// the runtime array may stay empty
	let (instance, log) = capture_errors(|| signature.create_binding_instance(true));
	instance?;
	assert_eq!(log.count(), 2);
	assert!(log.contains("g_Environment"));
	assert!(log.contains("g_EnvironmentSampler"));
	assert!(!log.contains("g_Bindless"));
	Ok(())
}
